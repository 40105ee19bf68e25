//! Aggregation commands

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::info;

use super::{connect_pool, WindowArgs};
use crate::aggregate::AggregationRunner;
use crate::config::Settings;
use crate::schema::Aggregation;
use crate::sql::TemplateStore;
use crate::storage::BarRepository;

/// Aggregate subcommands
#[derive(Subcommand)]
pub enum AggregateCommands {
    /// Rebuild candle-style aggregates
    Candles(AggregateArgs),
    /// Rebuild generic aggregates
    Generic(AggregateArgs),
}

/// Arguments for aggregate commands
#[derive(Args)]
pub struct AggregateArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Aggregation label (e.g., 5min, 1hour)
    #[arg(long)]
    pub aggregation: Aggregation,
}

/// Execute aggregate commands
pub async fn execute(cmd: AggregateCommands, settings: &Settings) -> Result<()> {
    let (candles, args) = match cmd {
        AggregateCommands::Candles(args) => (true, args),
        AggregateCommands::Generic(args) => (false, args),
    };

    let window = args.window.window()?;
    let pool = connect_pool(settings).await?;
    let runner = AggregationRunner::new(
        pool.clone(),
        TemplateStore::new(&settings.sql.template_dir),
    );

    let rebuild = if candles {
        runner
            .run_agg_stock_bars_candles(&window, &args.aggregation)
            .await?
    } else {
        runner.run_agg_stock_bars(&window, &args.aggregation).await?
    };

    let total = BarRepository::new(pool)
        .count_aggregates(&window, &args.aggregation)
        .await?;

    info!(
        "Aggregation complete: deleted {}, inserted {}, {} {} bars now in {}",
        rebuild.deleted, rebuild.inserted, total, args.aggregation, window
    );
    Ok(())
}
