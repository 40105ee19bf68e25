//! Record types and operation inputs
//!
//! This module defines the rows of the three bar/symbol tables together with
//! the validated inputs (`TimeWindow`, `Aggregation`) every maintenance job
//! takes.

mod market_data;
mod window;

pub use market_data::*;
pub use window::*;
