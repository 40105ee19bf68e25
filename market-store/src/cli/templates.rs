//! SQL template commands

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::info;

use crate::config::Settings;
use crate::sql::TemplateStore;

/// Templates subcommands
#[derive(Subcommand)]
pub enum TemplatesCommands {
    /// Load and validate every recompute template
    Check(CheckArgs),
}

/// Arguments for check command
#[derive(Args)]
pub struct CheckArgs {
    /// Template directory (defaults to sql.template_dir)
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

/// Execute templates commands
pub async fn execute(cmd: TemplatesCommands, settings: &Settings) -> Result<()> {
    match cmd {
        TemplatesCommands::Check(args) => {
            let dir = args.dir.unwrap_or_else(|| settings.sql.template_dir.clone());
            let store = TemplateStore::new(dir);

            for template in store.check_all().await? {
                let params: Vec<&str> = template.params().iter().map(|p| p.name()).collect();
                info!(
                    "  {} -> {}",
                    store.path_for(template.kind()).display(),
                    params.join(", ")
                );
            }
        }
    }

    Ok(())
}
