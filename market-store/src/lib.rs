//! # Market Store
//!
//! Maintenance jobs for a PostgreSQL store of one-minute stock bars.
//!
//! ## Features
//!
//! - **Symbol directory**: list active symbols and keep `dim_stocks` in sync
//!   with `fact_stock_bars`
//! - **Backfill**: re-impute gaps, find symbols missing sourced data and
//!   rebuild aggregates over backfilled data
//! - **Aggregation**: rebuild aggregated bars for a window and label
//!
//! ## Architecture
//!
//! Every rebuild deletes the target rows of a half-open time window and runs
//! a parameterized SQL template inside one transaction. The templates live in
//! `.sql` files so the recompute logic can change without a rebuild.

pub mod aggregate;
pub mod backfill;
pub mod cli;
pub mod config;
pub mod schema;
pub mod sql;
pub mod storage;
pub mod symbol;

// Re-export commonly used types
pub use aggregate::AggregationRunner;
pub use backfill::{BackfillError, BackfillExecutor, MarketDataFetcher, RefetchPlan};
pub use config::Settings;
pub use schema::{Aggregation, StockBar, StockBarAggregate, TimeWindow};
pub use sql::{SqlTemplate, TemplateKind, TemplateStore};
pub use storage::{
    BarRepository, ConnectionConfig, RepositoryError, RepositoryResult, WindowRebuild,
};
pub use symbol::{SymbolDirectory, SymbolGrouping};
