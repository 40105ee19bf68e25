//! Storage layer for the stock bar tables
//!
//! This module provides the connection provider, the repository error type,
//! batched bar writes and the transactional window rebuild shared by the
//! backfill and aggregation jobs.

mod connection;
mod repository;
mod window;

pub use connection::*;
pub use repository::*;
pub use window::*;
