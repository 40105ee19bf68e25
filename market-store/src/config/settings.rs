//! Application settings and configuration

use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Main application settings
///
/// Database credentials are not part of these settings; they come from the
/// `TRADING_*` variables read by [`crate::storage::ConnectionConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Connection pool sizing
    #[serde(default)]
    pub pool: PoolSettings,
    /// Recompute template location
    #[serde(default)]
    pub sql: SqlSettings,
}

/// Connection pool settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Seconds to wait for a free connection
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_acquire_timeout() -> u64 {
    30
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
        }
    }
}

/// SQL template settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlSettings {
    /// Directory holding the `.sql` recompute templates
    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("sql")
}

impl Default for SqlSettings {
    fn default() -> Self {
        Self {
            template_dir: default_template_dir(),
        }
    }
}

impl Settings {
    /// Load settings from configuration files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_prefix("MARKET_STORE")
    }

    /// Load settings with a custom environment variable prefix
    pub fn load_with_prefix(env_prefix: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config_dir = Self::config_dir();

        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(File::with_name(&format!("{}/local", config_dir)).required(false))
            // e.g. MARKET_STORE__POOL__MAX_CONNECTIONS
            .add_source(
                Environment::with_prefix(env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }

    fn config_dir() -> String {
        std::env::var("MARKET_STORE_CONFIG_DIR").unwrap_or_else(|_| "config".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.pool.max_connections, 5);
        assert_eq!(settings.pool.min_connections, 1);
        assert_eq!(settings.pool.acquire_timeout_secs, 30);
        assert_eq!(settings.sql.template_dir, PathBuf::from("sql"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let s = Config::builder()
            .add_source(File::from_str(
                "[pool]\nmax_connections = 12\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let settings: Settings = s.try_deserialize().unwrap();

        assert_eq!(settings.pool.max_connections, 12);
        assert_eq!(settings.pool.min_connections, 1);
        assert_eq!(settings.sql, SqlSettings::default());
    }
}
