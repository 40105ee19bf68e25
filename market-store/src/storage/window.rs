//! Delete-then-recompute of a time window
//!
//! Every backfill and aggregation job has the same shape:
//!
//! ```text
//! START -> DELETE(window, filter) -> RECOMPUTE(template) -> COMMIT -> DONE
//!              |                          |
//!              +--------> ERROR <---------+
//!                           |
//!                       ROLLBACK -> error returned to caller
//! ```
//!
//! Both statements run in a single transaction, so a failing recompute
//! restores the rows the delete removed. There is no retry loop; the delete
//! is unconditional, so re-running a failed job is safe.

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, error, info, warn};

use super::RepositoryResult;
use crate::schema::{Aggregation, TimeWindow, STOCK_BARS_TABLE, STOCK_BAR_AGGREGATES_TABLE};
use crate::sql::{SqlTemplate, TemplateArgs};

/// Which rows a rebuild replaces
#[derive(Debug, Clone, Copy)]
pub enum RebuildTarget<'a> {
    /// Imputed rows of the raw bar table; sourced rows are never touched
    ImputedBars,
    /// Aggregate rows carrying one aggregation label
    Aggregates(&'a Aggregation),
}

impl RebuildTarget<'_> {
    pub fn table(&self) -> &'static str {
        match self {
            RebuildTarget::ImputedBars => STOCK_BARS_TABLE,
            RebuildTarget::Aggregates(_) => STOCK_BAR_AGGREGATES_TABLE,
        }
    }

    fn aggregation(&self) -> Option<&Aggregation> {
        match self {
            RebuildTarget::ImputedBars => None,
            RebuildTarget::Aggregates(aggregation) => Some(*aggregation),
        }
    }
}

impl std::fmt::Display for RebuildTarget<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RebuildTarget::ImputedBars => write!(f, "imputed rows of {}", STOCK_BARS_TABLE),
            RebuildTarget::Aggregates(aggregation) => write!(
                f,
                "{} rows of {}",
                aggregation, STOCK_BAR_AGGREGATES_TABLE
            ),
        }
    }
}

/// Outcome of a committed rebuild
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WindowRebuild {
    /// Rows removed by the delete step
    pub deleted: u64,
    /// Rows reported by the recompute template
    pub inserted: u64,
}

/// Replace the target rows of `window` with the output of `template`.
///
/// The connection is taken from the pool for the duration of the transaction
/// and returned when it commits or rolls back.
pub async fn rebuild_window(
    pool: &PgPool,
    target: RebuildTarget<'_>,
    window: &TimeWindow,
    template: &SqlTemplate,
) -> RepositoryResult<WindowRebuild> {
    info!(
        "Rebuilding {} for {} using {}",
        target,
        window,
        template.kind()
    );

    let mut tx = pool.begin().await?;

    match rebuild_in(&mut tx, target, window, template).await {
        Ok(rebuild) => {
            tx.commit().await?;
            info!(
                "Rebuilt {} for {}: deleted {}, inserted {}",
                target, window, rebuild.deleted, rebuild.inserted
            );
            Ok(rebuild)
        }
        Err(e) => {
            error!("Error rebuilding {} for {}: {}", target, window, e);
            if let Err(rollback_err) = tx.rollback().await {
                warn!("Rollback after failed rebuild also failed: {}", rollback_err);
            }
            Err(e)
        }
    }
}

async fn rebuild_in(
    conn: &mut PgConnection,
    target: RebuildTarget<'_>,
    window: &TimeWindow,
    template: &SqlTemplate,
) -> RepositoryResult<WindowRebuild> {
    debug!("Deleting existing {} for {}", target, window);
    let deleted = delete_window(&mut *conn, target, window).await?;
    debug!("Deleted {} rows", deleted);

    let args = TemplateArgs {
        window: *window,
        aggregation: target.aggregation(),
    };

    debug!("Executing {}", template.kind());
    let inserted = template
        .bind(&args)?
        .execute(&mut *conn)
        .await?
        .rows_affected();

    Ok(WindowRebuild { deleted, inserted })
}

async fn delete_window(
    conn: &mut PgConnection,
    target: RebuildTarget<'_>,
    window: &TimeWindow,
) -> RepositoryResult<u64> {
    let result = match target {
        RebuildTarget::ImputedBars => {
            let query = format!(
                r#"
                DELETE FROM {}
                WHERE created_at >= $1
                  AND created_at < $2
                  AND is_imputed = TRUE
                "#,
                STOCK_BARS_TABLE
            );
            sqlx::query(&query)
                .bind(window.start())
                .bind(window.end())
                .execute(&mut *conn)
                .await?
        }
        RebuildTarget::Aggregates(aggregation) => {
            let query = format!(
                r#"
                DELETE FROM {}
                WHERE created_at >= $1
                  AND created_at < $2
                  AND aggregation = $3
                "#,
                STOCK_BAR_AGGREGATES_TABLE
            );
            sqlx::query(&query)
                .bind(window.start())
                .bind(window.end())
                .bind(aggregation.as_str())
                .execute(&mut *conn)
                .await?
        }
    };

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebuild_target_tables() {
        let agg = Aggregation::new("5min").unwrap();
        assert_eq!(RebuildTarget::ImputedBars.table(), "fact_stock_bars");
        assert_eq!(RebuildTarget::Aggregates(&agg).table(), "fact_stock_bars_agg");
        assert!(RebuildTarget::ImputedBars.aggregation().is_none());
        assert_eq!(
            RebuildTarget::Aggregates(&agg).aggregation().map(|a| a.as_str()),
            Some("5min")
        );
    }

    #[test]
    fn test_rebuild_target_display() {
        let agg = Aggregation::new("1hour").unwrap();
        assert_eq!(
            RebuildTarget::ImputedBars.to_string(),
            "imputed rows of fact_stock_bars"
        );
        assert_eq!(
            RebuildTarget::Aggregates(&agg).to_string(),
            "1hour rows of fact_stock_bars_agg"
        );
    }
}
