//! Symbol directory commands

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::info;

use super::connect_pool;
use crate::config::Settings;
use crate::symbol::{SymbolDirectory, SymbolGrouping};

/// Symbol subcommands
#[derive(Subcommand)]
pub enum SymbolCommands {
    /// List symbols that have bars in fact_stock_bars
    Active,
    /// List symbols in dim_stocks
    List(ListArgs),
    /// List symbols in dim_stocks beginning with a prefix
    StartingWith(StartingWithArgs),
    /// Add symbols seen in fact_stock_bars to dim_stocks
    Sync,
}

/// Arguments for list command
#[derive(Args)]
pub struct ListArgs {
    /// Group the output (alphabetical: distinct first letters)
    #[arg(long)]
    pub group_by: Option<SymbolGrouping>,
}

/// Arguments for starting-with command
#[derive(Args)]
pub struct StartingWithArgs {
    /// Case-sensitive symbol prefix
    pub prefix: String,
}

/// Execute symbol commands
pub async fn execute(cmd: SymbolCommands, settings: &Settings) -> Result<()> {
    let directory = SymbolDirectory::new(connect_pool(settings).await?);

    match cmd {
        SymbolCommands::Active => {
            let symbols = directory.get_active_symbols().await?;
            info!("Active symbols ({}):", symbols.len());
            print_symbols(&symbols);
        }
        SymbolCommands::List(args) => {
            let symbols = directory.load_stock_table_list(args.group_by).await?;
            match args.group_by {
                Some(grouping) => info!("Symbol groups ({}, {}):", grouping, symbols.len()),
                None => info!("Symbols ({}):", symbols.len()),
            }
            print_symbols(&symbols);
        }
        SymbolCommands::StartingWith(args) => {
            let symbols = directory.load_stock_starting_by(&args.prefix).await?;
            info!("Symbols starting with '{}' ({}):", args.prefix, symbols.len());
            print_symbols(&symbols);
        }
        SymbolCommands::Sync => {
            let inserted = directory.insert_new_stocks().await?;
            info!("Symbol sync complete: {} new symbols", inserted);
        }
    }

    Ok(())
}

fn print_symbols(symbols: &[String]) {
    for symbol in symbols {
        println!("{}", symbol);
    }
}
