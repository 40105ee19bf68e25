//! Market Store CLI
//!
//! Provides commands for:
//! - `symbol`: Symbol directory queries and sync
//! - `backfill`: Imputed bar, API and aggregate backfills
//! - `aggregate`: Aggregated bar rebuilds
//! - `templates`: SQL template validation

use anyhow::Result;
use clap::Parser;
use tracing::error;

use market_common::error::{ConfigurationError, ErrorClassification};
use market_common::logging::{init_logging, LogConfig};
use market_store::backfill::BackfillError;
use market_store::cli::{Cli, Commands};
use market_store::config::Settings;
use market_store::storage::RepositoryError;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let mut log_config = LogConfig::from_env();
    if std::env::var("LOG_LEVEL").is_err() {
        log_config = log_config.with_default_level("market_store=info");
    }
    init_logging(log_config).map_err(|e| anyhow::anyhow!(e))?;

    let cli = Cli::parse();
    let settings = Settings::load()?;

    let result = match cli.command {
        Commands::Symbol(cmd) => market_store::cli::symbol::execute(cmd, &settings).await,
        Commands::Backfill(cmd) => market_store::cli::backfill::execute(cmd, &settings).await,
        Commands::Aggregate(cmd) => market_store::cli::aggregate::execute(cmd, &settings).await,
        Commands::Templates(cmd) => market_store::cli::templates::execute(cmd, &settings).await,
    };

    if let Err(e) = &result {
        report(e);
    }
    result
}

/// Log the error category so operators can tell whether re-running may help
fn report(e: &anyhow::Error) {
    let classified = e
        .downcast_ref::<RepositoryError>()
        .map(|e| (e.category(), e.is_transient()))
        .or_else(|| {
            e.downcast_ref::<BackfillError>()
                .map(|e| (e.category(), e.is_transient()))
        })
        .or_else(|| {
            e.downcast_ref::<ConfigurationError>()
                .map(|e| (e.category(), e.is_transient()))
        });

    match classified {
        Some((category, true)) => {
            error!("Command failed ({}), safe to re-run: {}", category, e)
        }
        Some((category, false)) => error!("Command failed ({}): {}", category, e),
        None => error!("Command failed: {}", e),
    }
}
