//! Backfill jobs for the stock bar store
//!
//! ## Jobs
//!
//! - **Imputed bars**: delete and re-impute the imputed rows of a window
//! - **API refill**: find symbols missing sourced bars and hand them to a
//!   [`MarketDataFetcher`]
//! - **Aggregates**: rebuild one aggregation over backfilled data
//!
//! ## Usage
//!
//! ```ignore
//! use market_store::backfill::{BackfillExecutor, SymbolListExport};
//! use market_store::sql::TemplateStore;
//!
//! let executor = BackfillExecutor::new(pool, TemplateStore::new("sql"));
//! executor.run_backfill_fact_stock_bars(&window).await?;
//! let plan = executor
//!     .run_backfill_fact_stock_bars_api(&window, &SymbolListExport::stdout())
//!     .await?;
//! ```

mod executor;
mod fetcher;

pub use executor::{BackfillExecutor, RefetchPlan};
pub use fetcher::{FetchError, MarketDataFetcher, RefetchRequest, SymbolListExport};

use std::time::Duration;

use thiserror::Error;

use market_common::error::{ErrorCategory, ErrorClassification};

use crate::storage::RepositoryError;

/// Errors from the API backfill, which touches both the store and the fetcher
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BackfillError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
}

impl From<sqlx::Error> for BackfillError {
    fn from(e: sqlx::Error) -> Self {
        BackfillError::Repository(e.into())
    }
}

impl ErrorClassification for BackfillError {
    fn category(&self) -> ErrorCategory {
        match self {
            BackfillError::Repository(e) => e.category(),
            BackfillError::Fetch(e) => e.category(),
        }
    }

    fn suggested_retry_delay(&self) -> Option<Duration> {
        match self {
            BackfillError::Repository(e) => e.suggested_retry_delay(),
            BackfillError::Fetch(e) => e.suggested_retry_delay(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backfill_error_delegates_classification() {
        let err = BackfillError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, BackfillError::Repository(_)));
        assert_eq!(err.category(), ErrorCategory::ResourceExhausted);

        let err = BackfillError::from(FetchError::Rejected("unknown symbol".into()));
        assert!(err.is_permanent());
        assert_eq!(err.to_string(), "Fetch error: Fetch rejected: unknown symbol");
    }
}
