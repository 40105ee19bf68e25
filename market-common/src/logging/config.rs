//! Logging configuration and initialization.

use std::collections::HashMap;
use std::env;

use tracing_subscriber::fmt::time::{ChronoLocal, ChronoUtc};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable format with colors (default for terminals)
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for machine parsing
    Json,
}

impl LogFormat {
    /// Parse format from string
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

/// Timestamp format for log entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampFormat {
    /// Local time with timezone (default)
    #[default]
    Local,
    /// UTC time (ISO 8601)
    Utc,
    /// No timestamps
    None,
}

impl TimestampFormat {
    /// Parse format from string
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "utc" => TimestampFormat::Utc,
            "none" | "off" => TimestampFormat::None,
            _ => TimestampFormat::Local,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output format (pretty, compact, json)
    pub format: LogFormat,
    /// Timestamp format
    pub timestamps: TimestampFormat,
    /// Default log level filter, used when `RUST_LOG` is not set
    pub default_level: String,
    /// Include source file location
    pub include_location: bool,
    /// Include thread IDs
    pub include_thread_ids: bool,
    /// Include target (module path)
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            timestamps: TimestampFormat::Local,
            default_level: "info".to_string(),
            include_location: false,
            include_thread_ids: false,
            include_target: true,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    ///
    /// Reads:
    /// - `LOG_FORMAT`: pretty, compact, or json
    /// - `LOG_TIMESTAMPS`: local, utc, or none
    /// - `LOG_LEVEL`: default log level (fallback if RUST_LOG not set)
    /// - `LOG_LOCATION`: true/false for file:line info
    /// - `LOG_THREAD_IDS`: true/false for thread IDs
    pub fn from_env() -> Self {
        let vars: HashMap<String, String> = env::vars()
            .filter(|(key, _)| key.starts_with("LOG_"))
            .collect();
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Create config from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str, default: bool| {
            lookup(key)
                .map(|s| s == "true" || s == "1")
                .unwrap_or(default)
        };

        Self {
            format: lookup("LOG_FORMAT")
                .map(|s| LogFormat::from_str(&s))
                .unwrap_or_default(),
            timestamps: lookup("LOG_TIMESTAMPS")
                .map(|s| TimestampFormat::from_str(&s))
                .unwrap_or_default(),
            default_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            include_location: flag("LOG_LOCATION", false),
            include_thread_ids: flag("LOG_THREAD_IDS", false),
            include_target: true,
        }
    }

    /// Set the default log level
    pub fn with_default_level(mut self, level: impl Into<String>) -> Self {
        self.default_level = level.into();
        self
    }
}

/// Initialize logging with the given configuration
///
/// # Errors
///
/// Returns an error if the subscriber cannot be initialized (e.g., already set)
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    match config.format {
        LogFormat::Json => init_json_logging(&config, env_filter),
        LogFormat::Compact => init_fmt_logging(&config, env_filter, true),
        LogFormat::Pretty => init_fmt_logging(&config, env_filter, false),
    }
}

fn init_json_logging(
    config: &LogConfig,
    env_filter: EnvFilter,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let layer = fmt::layer()
        .json()
        .with_current_span(false)
        .with_target(config.include_target)
        .with_thread_ids(config.include_thread_ids)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_timer(ChronoUtc::rfc_3339());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()?;

    Ok(())
}

fn init_fmt_logging(
    config: &LogConfig,
    env_filter: EnvFilter,
    compact: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let layer = fmt::layer()
        .with_target(config.include_target)
        .with_thread_ids(config.include_thread_ids)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_ansi(atty::is(atty::Stream::Stdout));

    // Timer and compact() both change the layer type, so each combination
    // is initialized separately.
    let registry = tracing_subscriber::registry().with(env_filter);
    match (config.timestamps, compact) {
        (TimestampFormat::Local, false) => registry
            .with(layer.with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f %z".to_string())))
            .try_init()?,
        (TimestampFormat::Local, true) => registry
            .with(
                layer
                    .compact()
                    .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f %z".to_string())),
            )
            .try_init()?,
        (TimestampFormat::Utc, false) => registry
            .with(layer.with_timer(ChronoUtc::new("%Y-%m-%dT%H:%M:%S%.3fZ".to_string())))
            .try_init()?,
        (TimestampFormat::Utc, true) => registry
            .with(
                layer
                    .compact()
                    .with_timer(ChronoUtc::new("%Y-%m-%dT%H:%M:%S%.3fZ".to_string())),
            )
            .try_init()?,
        (TimestampFormat::None, false) => registry.with(layer.without_time()).try_init()?,
        (TimestampFormat::None, true) => {
            registry.with(layer.compact().without_time()).try_init()?
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!(LogFormat::from_str("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_str("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_str("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::from_str("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("unknown"), LogFormat::Pretty);
    }

    #[test]
    fn test_timestamp_format_from_str() {
        assert_eq!(TimestampFormat::from_str("UTC"), TimestampFormat::Utc);
        assert_eq!(TimestampFormat::from_str("local"), TimestampFormat::Local);
        assert_eq!(TimestampFormat::from_str("off"), TimestampFormat::None);
    }

    #[test]
    fn test_log_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("LOG_FORMAT", "compact"),
            ("LOG_TIMESTAMPS", "utc"),
            ("LOG_LEVEL", "market_store=debug"),
            ("LOG_LOCATION", "1"),
        ]
        .into_iter()
        .collect();

        let config = LogConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.timestamps, TimestampFormat::Utc);
        assert_eq!(config.default_level, "market_store=debug");
        assert!(config.include_location);
        assert!(!config.include_thread_ids);
    }

    #[test]
    fn test_log_config_from_empty_lookup_matches_default() {
        let config = LogConfig::from_lookup(|_| None);
        let default = LogConfig::default();
        assert_eq!(config.format, default.format);
        assert_eq!(config.timestamps, default.timestamps);
        assert_eq!(config.default_level, default.default_level);
        assert_eq!(config.include_location, default.include_location);
    }
}
