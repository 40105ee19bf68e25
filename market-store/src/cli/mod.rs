//! Command-line interface
//!
//! Provides CLI commands for the stock bar maintenance jobs.

pub mod aggregate;
pub mod backfill;
pub mod symbol;
pub mod templates;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::{Args, Parser, Subcommand};
use sqlx::PgPool;

use crate::config::Settings;
use crate::schema::TimeWindow;
use crate::storage::{connect, ConnectionConfig};

/// Market Store CLI
#[derive(Parser)]
#[command(name = "market-store")]
#[command(about = "Maintenance jobs for the stock bar store")]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Symbol directory commands
    #[command(subcommand)]
    Symbol(symbol::SymbolCommands),
    /// Backfill imputed bars, missing API data and backfilled aggregates
    #[command(subcommand)]
    Backfill(backfill::BackfillCommands),
    /// Rebuild aggregated bars
    #[command(subcommand)]
    Aggregate(aggregate::AggregateCommands),
    /// SQL template commands
    #[command(subcommand)]
    Templates(templates::TemplatesCommands),
}

/// Time window arguments shared by the rebuild commands
#[derive(Args, Debug, Clone)]
pub struct WindowArgs {
    /// Window start, inclusive (RFC 3339 or YYYY-MM-DDTHH:MM[:SS] in UTC)
    #[arg(long, value_parser = parse_timestamp)]
    pub start: DateTime<Utc>,

    /// Window end, exclusive (RFC 3339 or YYYY-MM-DDTHH:MM[:SS] in UTC)
    #[arg(long, value_parser = parse_timestamp)]
    pub end: DateTime<Utc>,
}

impl WindowArgs {
    pub fn window(&self) -> Result<TimeWindow> {
        Ok(TimeWindow::new(self.start, self.end)?)
    }
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse a command-line timestamp
///
/// Accepts RFC 3339 with any offset, a naive date-time taken as UTC, or a
/// bare date meaning midnight UTC.
pub fn parse_timestamp(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| {
            format!(
                "Invalid timestamp '{}'. Use RFC 3339 or YYYY-MM-DDTHH:MM[:SS] (UTC)",
                s
            )
        })
}

/// Open a pool using the `TRADING_*` connection variables
pub async fn connect_pool(settings: &Settings) -> Result<PgPool> {
    let config = ConnectionConfig::from_env()?;
    Ok(connect(&config, &settings.pool).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 4, 1, 9, 30, 0).unwrap();

        assert_eq!(parse_timestamp("2025-04-01T09:30:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-04-01T05:30:00-04:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-04-01T09:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-04-01T09:30").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-04-01 09:30").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2025-04-01").unwrap(),
            Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("2025-13-01T00:00").is_err());
    }

    #[test]
    fn test_cli_parses_rebuild_command() {
        let cli = Cli::try_parse_from([
            "market-store",
            "aggregate",
            "generic",
            "--start",
            "2025-04-01T00:00",
            "--end",
            "2025-04-01T01:00",
            "--aggregation",
            "5min",
        ])
        .unwrap();

        match cli.command {
            Commands::Aggregate(aggregate::AggregateCommands::Generic(args)) => {
                assert_eq!(args.aggregation.as_str(), "5min");
                assert_eq!(args.window.window().unwrap().expected_minutes(), 60);
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn test_cli_rejects_empty_aggregation() {
        let result = Cli::try_parse_from([
            "market-store",
            "aggregate",
            "candles",
            "--start",
            "2025-04-01T00:00",
            "--end",
            "2025-04-01T01:00",
            "--aggregation",
            "",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_api_backfill_defaults_to_manual_range() {
        let cli = Cli::try_parse_from(["market-store", "backfill", "api"]).unwrap();

        match cli.command {
            Commands::Backfill(backfill::BackfillCommands::Api(args)) => {
                assert_eq!(
                    args.start,
                    Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap()
                );
                assert_eq!(
                    args.end,
                    Utc.with_ymd_and_hms(2025, 5, 5, 23, 59, 0).unwrap()
                );
                assert!(args.output.is_none());
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn test_symbol_list_group_by() {
        let cli = Cli::try_parse_from([
            "market-store",
            "symbol",
            "list",
            "--group-by",
            "alphabetical",
        ])
        .unwrap();

        match cli.command {
            Commands::Symbol(symbol::SymbolCommands::List(args)) => {
                assert_eq!(
                    args.group_by,
                    Some(crate::symbol::SymbolGrouping::Alphabetical)
                );
            }
            _ => panic!("wrong command"),
        }
    }
}
