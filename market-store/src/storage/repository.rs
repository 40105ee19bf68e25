//! Stock bar repository
//!
//! Provides the repository error type shared by every storage operation and
//! batched writes/counts for the raw and aggregated bar tables.

use std::time::Duration;

use sqlx::{PgPool, Row};
use thiserror::Error;
use tracing::debug;

use market_common::error::{ConfigurationError, ErrorCategory, ErrorClassification};

use crate::schema::{
    Aggregation, StockBar, StockBarAggregate, TimeWindow, STOCK_BARS_TABLE,
    STOCK_BAR_AGGREGATES_TABLE,
};
use crate::sql::TemplateError;

/// Repository errors
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl ErrorClassification for RepositoryError {
    fn category(&self) -> ErrorCategory {
        match self {
            RepositoryError::Database(e) => e.category(),
            RepositoryError::Configuration(_) => ErrorCategory::Configuration,
            RepositoryError::Template(_) => ErrorCategory::Configuration,
            RepositoryError::InvalidData(_) => ErrorCategory::Permanent,
        }
    }

    fn suggested_retry_delay(&self) -> Option<Duration> {
        match self {
            RepositoryError::Database(e) => e.suggested_retry_delay(),
            _ => None,
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Rows per multi-row INSERT
pub const BATCH_SIZE: usize = 1000;

/// Writes and counts bars in the fact tables
pub struct BarRepository {
    pool: PgPool,
}

impl BarRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Batch insert raw bars, skipping rows that conflict with existing keys
    pub async fn insert_stock_bars(&self, bars: &[StockBar]) -> RepositoryResult<u64> {
        if bars.is_empty() {
            return Ok(0);
        }

        let mut total_inserted = 0;
        for chunk in bars.chunks(BATCH_SIZE) {
            total_inserted += self.insert_stock_bar_batch(chunk).await?;
        }

        debug!("Batch inserted {} stock bars", total_inserted);
        Ok(total_inserted)
    }

    async fn insert_stock_bar_batch(&self, bars: &[StockBar]) -> RepositoryResult<u64> {
        let mut query = format!(
            r#"
            INSERT INTO {} (
                symbol, created_at, open, high, low, close,
                volume, trade_count, vwap, is_imputed
            ) VALUES
            "#,
            STOCK_BARS_TABLE
        );
        query.push_str(&placeholders(bars.len(), 10));
        query.push_str(" ON CONFLICT DO NOTHING");

        let mut sqlx_query = sqlx::query(&query);
        for bar in bars {
            sqlx_query = sqlx_query
                .bind(&bar.symbol)
                .bind(bar.created_at)
                .bind(bar.open)
                .bind(bar.high)
                .bind(bar.low)
                .bind(bar.close)
                .bind(bar.volume)
                .bind(bar.trade_count)
                .bind(bar.vwap)
                .bind(bar.is_imputed);
        }

        let result = sqlx_query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Batch insert aggregated bars, skipping rows that conflict with existing keys
    pub async fn insert_aggregates(&self, aggregates: &[StockBarAggregate]) -> RepositoryResult<u64> {
        if aggregates.is_empty() {
            return Ok(0);
        }

        let mut total_inserted = 0;
        for chunk in aggregates.chunks(BATCH_SIZE) {
            total_inserted += self.insert_aggregate_batch(chunk).await?;
        }

        debug!("Batch inserted {} aggregated bars", total_inserted);
        Ok(total_inserted)
    }

    async fn insert_aggregate_batch(
        &self,
        aggregates: &[StockBarAggregate],
    ) -> RepositoryResult<u64> {
        let mut query = format!(
            r#"
            INSERT INTO {} (
                symbol, created_at, aggregation, open, high, low, close,
                volume, trade_count, vwap
            ) VALUES
            "#,
            STOCK_BAR_AGGREGATES_TABLE
        );
        query.push_str(&placeholders(aggregates.len(), 10));
        query.push_str(" ON CONFLICT DO NOTHING");

        let mut sqlx_query = sqlx::query(&query);
        for agg in aggregates {
            sqlx_query = sqlx_query
                .bind(&agg.symbol)
                .bind(agg.created_at)
                .bind(&agg.aggregation)
                .bind(agg.open)
                .bind(agg.high)
                .bind(agg.low)
                .bind(agg.close)
                .bind(agg.volume)
                .bind(agg.trade_count)
                .bind(agg.vwap);
        }

        let result = sqlx_query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Count raw bars in a window, optionally restricted to imputed or sourced rows
    pub async fn count_stock_bars(
        &self,
        window: &TimeWindow,
        is_imputed: Option<bool>,
    ) -> RepositoryResult<u64> {
        let query = format!(
            r#"
            SELECT COUNT(*) AS row_count
            FROM {}
            WHERE created_at >= $1
              AND created_at < $2
              AND ($3::BOOLEAN IS NULL OR is_imputed = $3)
            "#,
            STOCK_BARS_TABLE
        );

        let row = sqlx::query(&query)
            .bind(window.start())
            .bind(window.end())
            .bind(is_imputed)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get::<i64, _>("row_count") as u64)
    }

    /// Count aggregated bars in a window for one aggregation
    pub async fn count_aggregates(
        &self,
        window: &TimeWindow,
        aggregation: &Aggregation,
    ) -> RepositoryResult<u64> {
        let query = format!(
            r#"
            SELECT COUNT(*) AS row_count
            FROM {}
            WHERE created_at >= $1
              AND created_at < $2
              AND aggregation = $3
            "#,
            STOCK_BAR_AGGREGATES_TABLE
        );

        let row = sqlx::query(&query)
            .bind(window.start())
            .bind(window.end())
            .bind(aggregation.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get::<i64, _>("row_count") as u64)
    }
}

/// Build `($1, $2, ...), ($n+1, ...)` for a multi-row VALUES clause
fn placeholders(rows: usize, columns: usize) -> String {
    let mut out = String::with_capacity(rows * columns * 5);
    let mut param = 1;

    for row in 0..rows {
        if row > 0 {
            out.push_str(", ");
        }
        out.push('(');
        for column in 0..columns {
            if column > 0 {
                out.push_str(", ");
            }
            out.push('$');
            out.push_str(&param.to_string());
            param += 1;
        }
        out.push(')');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1, 3), "($1, $2, $3)");
        assert_eq!(placeholders(2, 2), "($1, $2), ($3, $4)");
        assert_eq!(placeholders(0, 4), "");
    }

    #[test]
    fn test_repository_error_classification() {
        let err = RepositoryError::InvalidData("bad window".into());
        assert_eq!(err.category(), ErrorCategory::Permanent);
        assert!(!err.is_transient());

        let err = RepositoryError::from(sqlx::Error::PoolTimedOut);
        assert!(err.is_transient());
        assert_eq!(err.suggested_retry_delay(), Some(Duration::from_millis(500)));

        let err = RepositoryError::from(ConfigurationError::EnvVarMissing("TRADING_ENV".into()));
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(
            err.to_string(),
            "Configuration error: Environment variable not set: TRADING_ENV"
        );
    }
}
