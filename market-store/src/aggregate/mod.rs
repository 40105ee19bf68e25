//! Aggregation jobs
//!
//! Both jobs replace the rows of one aggregation label inside a window with
//! the output of their template. Rows for other labels and outside the window
//! are left alone.

use sqlx::PgPool;
use tracing::{error, info};

use crate::schema::{Aggregation, TimeWindow};
use crate::sql::{TemplateKind, TemplateStore};
use crate::storage::{rebuild_window, RebuildTarget, RepositoryResult, WindowRebuild};

/// Runs the aggregation templates against one pool
pub struct AggregationRunner {
    pool: PgPool,
    templates: TemplateStore,
}

impl AggregationRunner {
    pub fn new(pool: PgPool, templates: TemplateStore) -> Self {
        Self { pool, templates }
    }

    /// Rebuild candle-style aggregates
    pub async fn run_agg_stock_bars_candles(
        &self,
        window: &TimeWindow,
        aggregation: &Aggregation,
    ) -> RepositoryResult<WindowRebuild> {
        self.run(TemplateKind::AggStockBarsCandles, window, aggregation)
            .await
    }

    /// Rebuild generic aggregates
    pub async fn run_agg_stock_bars(
        &self,
        window: &TimeWindow,
        aggregation: &Aggregation,
    ) -> RepositoryResult<WindowRebuild> {
        self.run(TemplateKind::AggStockBars, window, aggregation).await
    }

    async fn run(
        &self,
        kind: TemplateKind,
        window: &TimeWindow,
        aggregation: &Aggregation,
    ) -> RepositoryResult<WindowRebuild> {
        info!("Aggregating stock data ({}, {}) for {}", kind, aggregation, window);

        let template = self.templates.load(kind).await.map_err(|e| {
            error!("Error loading {} template: {}", kind, e);
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
