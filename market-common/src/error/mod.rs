//! Shared error handling for the market data store.
//!
//! This module provides:
//! - Common error types that can be reused across crates
//! - Error classification traits for retry decisions
//!
//! # Usage
//!
//! ```rust,ignore
//! use market_common::error::ErrorClassification;
//!
//! fn report(err: &impl ErrorClassification) {
//!     if err.is_transient() {
//!         if let Some(delay) = err.suggested_retry_delay() {
//!             // Re-run the operation after delay
//!         }
//!     }
//! }
//! ```

mod common;
mod traits;

pub use common::*;
pub use traits::*;
