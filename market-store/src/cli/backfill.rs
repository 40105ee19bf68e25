//! Backfill commands
//!
//! Provides CLI commands for:
//! - Re-imputing the imputed raw bars of a window
//! - Finding symbols with missing sourced bars and exporting a re-fetch request
//! - Rebuilding an aggregation over backfilled data

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use tracing::info;

use super::aggregate::AggregateArgs;
use super::{connect_pool, parse_timestamp, WindowArgs};
use crate::backfill::{BackfillExecutor, SymbolListExport};
use crate::config::Settings;
use crate::schema::TimeWindow;
use crate::sql::TemplateStore;
use crate::storage::BarRepository;

/// Backfill subcommands
#[derive(Subcommand)]
pub enum BackfillCommands {
    /// Delete and re-impute imputed bars in a window
    Imputed(WindowArgs),
    /// Export symbols missing sourced bars for re-fetching from the API
    Api(ApiArgs),
    /// Rebuild one aggregation over backfilled data
    Aggregate(AggregateArgs),
}

/// Arguments for api command
#[derive(Args)]
pub struct ApiArgs {
    /// Window start, inclusive
    #[arg(long, value_parser = parse_timestamp, default_value = "2025-04-01T00:00")]
    pub start: DateTime<Utc>,

    /// Window end, exclusive
    #[arg(long, value_parser = parse_timestamp, default_value = "2025-05-05T23:59")]
    pub end: DateTime<Utc>,

    /// Write the re-fetch request to this file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Execute backfill commands
pub async fn execute(cmd: BackfillCommands, settings: &Settings) -> Result<()> {
    match cmd {
        BackfillCommands::Imputed(args) => execute_imputed(args, settings).await,
        BackfillCommands::Api(args) => execute_api(args, settings).await,
        BackfillCommands::Aggregate(args) => execute_aggregate(args, settings).await,
    }
}

async fn execute_imputed(args: WindowArgs, settings: &Settings) -> Result<()> {
    let window = args.window()?;
    let pool = connect_pool(settings).await?;
    let executor = BackfillExecutor::new(
        pool.clone(),
        TemplateStore::new(&settings.sql.template_dir),
    );

    let rebuild = executor.run_backfill_fact_stock_bars(&window).await?;
    let imputed = BarRepository::new(pool)
        .count_stock_bars(&window, Some(true))
        .await?;

    info!(
        "Backfill complete: deleted {}, inserted {}, {} imputed bars now in {}",
        rebuild.deleted, rebuild.inserted, imputed, window
    );
    Ok(())
}

async fn execute_api(args: ApiArgs, settings: &Settings) -> Result<()> {
    let window = TimeWindow::new(args.start, args.end)?;
    let pool = connect_pool(settings).await?;
    let executor = BackfillExecutor::new(pool, TemplateStore::new(&settings.sql.template_dir));
    let export = SymbolListExport::new(args.output);

    let plan = executor
        .run_backfill_fact_stock_bars_api(&window, &export)
        .await?;

    info!(
        "API backfill planned: {} symbols below {} bars in {}",
        plan.symbols.len(),
        plan.expected_minutes,
        window
    );
    Ok(())
}

async fn execute_aggregate(args: AggregateArgs, settings: &Settings) -> Result<()> {
    let window = args.window.window()?;
    let pool = connect_pool(settings).await?;
    let executor = BackfillExecutor::new(
        pool.clone(),
        TemplateStore::new(&settings.sql.template_dir),
    );

    let rebuild = executor
        .run_agg_backfill_stock_bars(&window, &args.aggregation)
        .await?;
    let total = BarRepository::new(pool)
        .count_aggregates(&window, &args.aggregation)
        .await?;

    info!(
        "Aggregation backfill complete: deleted {}, inserted {}, {} {} bars now in {}",
        rebuild.deleted, rebuild.inserted, total, args.aggregation, window
    );
    Ok(())
}
