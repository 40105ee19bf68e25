//! Backfill executor
//!
//! Rebuilds imputed raw bars and backfilled aggregates for a window, and
//! works out which symbols need a fresh pull from the market data API.

use serde::Serialize;
use sqlx::PgPool;
use tracing::{error, info};

use crate::schema::{Aggregation, TimeWindow, STOCKS_TABLE, STOCK_BARS_TABLE};
use crate::sql::{TemplateKind, TemplateStore};
use crate::storage::{rebuild_window, RebuildTarget, RepositoryResult, WindowRebuild};

use super::{BackfillError, MarketDataFetcher};

/// Symbols handed to the fetcher by an API backfill
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefetchPlan {
    pub window: TimeWindow,
    /// Whole minutes in the window; one sourced bar per minute is full coverage
    pub expected_minutes: i64,
    pub symbols: Vec<String>,
}

impl RefetchPlan {
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Runs the backfill jobs against one pool
pub struct BackfillExecutor {
    pool: PgPool,
    templates: TemplateStore,
}

impl BackfillExecutor {
    /// Create a new backfill executor
    pub fn new(pool: PgPool, templates: TemplateStore) -> Self {
        Self { pool, templates }
    }

    /// Replace the imputed raw bars of `window` with a fresh imputation
    pub async fn run_backfill_fact_stock_bars(
        &self,
        window: &TimeWindow,
    ) -> RepositoryResult<WindowRebuild> {
        info!("Backfilling imputed stock bars for {}", window);

        let template = self
            .templates
            .load(TemplateKind::BackfillFactStockBars)
            .await
            .map_err(|e| {
                error!("Error loading backfill template: {}", e);
                e
            })?;

        rebuild_window(&self.pool, RebuildTarget::ImputedBars, window, &template).await
    }

    /// Hand every under-covered symbol in `window` to `fetcher`
    ///
    /// A symbol is under-covered when it has fewer sourced bars than whole
    /// minutes in the window. Symbols with no bars at all are included.
    pub async fn run_backfill_fact_stock_bars_api<F>(
        &self,
        window: &TimeWindow,
        fetcher: &F,
    ) -> Result<RefetchPlan, BackfillError>
    where
        F: MarketDataFetcher + ?Sized,
    {
        info!("Backfilling data for symbols over {}", window);

        let expected_minutes = window.expected_minutes();
        let symbols = self.under_covered_symbols(window).await?;

        let plan = RefetchPlan {
            window: *window,
            expected_minutes,
            symbols,
        };

        if plan.is_empty() {
            info!("All symbols have {} bars for {}", expected_minutes, window);
            return Ok(plan);
        }

        info!("Reloading {} symbols from the market data API", plan.symbols.len());
        fetcher.fetch_bars(window, &plan.symbols).await.map_err(|e| {
            error!("Error reloading symbols for {}: {}", window, e);
            e
        })?;
        info!("Reloaded {} symbols", plan.symbols.len());

        Ok(plan)
    }

    /// Symbols in `dim_stocks` with fewer sourced bars than minutes in `window`
    pub async fn under_covered_symbols(&self, window: &TimeWindow) -> RepositoryResult<Vec<String>> {
        let query = format!(
            r#"
            WITH counted_bars AS (
                SELECT symbol, COUNT(*) AS actual_count
                FROM {bars}
                WHERE created_at >= $1
                  AND created_at < $2
                  AND is_imputed = FALSE
                GROUP BY symbol
            )
            SELECT ds.symbol
            FROM {stocks} ds
            LEFT JOIN counted_bars cb ON ds.symbol = cb.symbol
            WHERE COALESCE(cb.actual_count, 0) < $3
            ORDER BY ds.symbol
            "#,
            bars = STOCK_BARS_TABLE,
            stocks = STOCKS_TABLE
        );

        let symbols: Vec<String> = sqlx::query_scalar(&query)
            .bind(window.start())
            .bind(window.end())
            .bind(window.expected_minutes())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Error computing bar coverage for {}: {}", window, e);
                e
            })?;

        Ok(symbols)
    }

    /// Replace the `aggregation` rows of `window` using the backfill aggregation
    pub async fn run_agg_backfill_stock_bars(
        &self,
        window: &TimeWindow,
        aggregation: &Aggregation,
    ) -> RepositoryResult<WindowRebuild> {
        info!("Aggregating backfilled stock bars ({}) for {}", aggregation, window);

        let template = self
            .templates
            .load(TemplateKind::AggBackfillStockBars)
            .await
            .map_err(|e| {
                error!("Error loading aggregation backfill template: {}", e);
                e
            })?;

        rebuild_window(
            &self.pool,
            RebuildTarget::Aggregates(aggregation),
            window,
            &template,
        )
        .await
    }
}
