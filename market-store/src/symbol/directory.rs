//! Database-backed symbol directory

use sqlx::PgPool;
use tracing::{debug, error, info, warn};

use super::{apply_grouping, escape_like, SymbolGrouping};
use crate::schema::{STOCKS_TABLE, STOCK_BARS_TABLE};
use crate::storage::RepositoryResult;

/// Reads and maintains the `dim_stocks` table
pub struct SymbolDirectory {
    pool: PgPool,
}

impl SymbolDirectory {
    /// Create a new symbol directory
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Distinct symbols that have at least one bar in `fact_stock_bars`
    pub async fn get_active_symbols(&self) -> RepositoryResult<Vec<String>> {
        let query = format!(
            "SELECT DISTINCT symbol FROM {} ORDER BY symbol",
            STOCK_BARS_TABLE
        );

        let symbols: Vec<String> = sqlx::query_scalar(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Error fetching active symbols: {}", e);
                e
            })?;

        debug!("Found {} active symbols", symbols.len());
        Ok(symbols)
    }

    /// Every symbol in `dim_stocks`, optionally grouped
    pub async fn load_stock_table_list(
        &self,
        group_by: Option<SymbolGrouping>,
    ) -> RepositoryResult<Vec<String>> {
        let query = format!("SELECT symbol FROM {} ORDER BY symbol", STOCKS_TABLE);

        let symbols: Vec<String> = sqlx::query_scalar(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Error loading stock table list: {}", e);
                e
            })?;

        debug!("Loaded {} symbols from {}", symbols.len(), STOCKS_TABLE);
        Ok(apply_grouping(symbols, group_by))
    }

    /// Symbols in `dim_stocks` beginning with `prefix` (case-sensitive)
    pub async fn load_stock_starting_by(&self, prefix: &str) -> RepositoryResult<Vec<String>> {
        let query = format!(
            r#"
            SELECT symbol FROM {}
            WHERE symbol LIKE $1 ESCAPE '\'
            ORDER BY symbol
            "#,
            STOCKS_TABLE
        );

        let pattern = format!("{}%", escape_like(prefix));
        let symbols: Vec<String> = sqlx::query_scalar(&query)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Error loading symbols starting with '{}': {}", prefix, e);
                e
            })?;

        debug!("Found {} symbols starting with '{}'", symbols.len(), prefix);
        Ok(symbols)
    }

    /// Add every symbol seen in `fact_stock_bars` that `dim_stocks` lacks.
    ///
    /// Returns the number of symbols inserted. On failure the transaction is
    /// rolled back and the error returned.
    pub async fn insert_new_stocks(&self) -> RepositoryResult<u64> {
        let query = format!(
            r#"
            INSERT INTO {stocks} (symbol)
            SELECT DISTINCT b.symbol
            FROM {bars} b
            WHERE NOT EXISTS (
                SELECT 1 FROM {stocks} s WHERE s.symbol = b.symbol
            )
            "#,
            stocks = STOCKS_TABLE,
            bars = STOCK_BARS_TABLE
        );

        let mut tx = self.pool.begin().await?;

        match sqlx::query(&query).execute(&mut *tx).await {
            Ok(result) => {
                tx.commit().await?;
                let inserted = result.rows_affected();
                info!("Inserted {} new symbols into {}", inserted, STOCKS_TABLE);
                Ok(inserted)
            }
            Err(e) => {
                error!("Error inserting new stocks: {}", e);
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback of symbol sync failed: {}", rollback_err);
                }
                Err(e.into())
            }
        }
    }
}
