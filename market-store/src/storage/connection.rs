//! PostgreSQL connection provider
//!
//! Credentials come from the `TRADING_*` environment variables. Host and port
//! are selected by the deployment tag in `TRADING_ENV`, so one `.env` file can
//! carry several environments side by side:
//!
//! ```text
//! TRADING_ENV=DEV
//! TRADING_POSTGRES_USER=trader
//! TRADING_POSTGRES_PASSWORD=secret
//! TRADING_POSTGRES_HOST_DEV=localhost
//! TRADING_POSTGRES_PORT_DEV=5432
//! TRADING_POSTGRES_DB=market
//! ```

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tracing::info;

use market_common::error::ConfigurationError;

use super::RepositoryResult;
use crate::config::PoolSettings;

pub const ENV_TAG_VAR: &str = "TRADING_ENV";
pub const USER_VAR: &str = "TRADING_POSTGRES_USER";
pub const PASSWORD_VAR: &str = "TRADING_POSTGRES_PASSWORD";
pub const HOST_VAR_PREFIX: &str = "TRADING_POSTGRES_HOST_";
pub const PORT_VAR_PREFIX: &str = "TRADING_POSTGRES_PORT_";
pub const DATABASE_VAR: &str = "TRADING_POSTGRES_DB";

/// Connection parameters for the market data database
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Deployment tag the host and port were selected by
    pub environment: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
}

impl ConnectionConfig {
    /// Read the connection parameters from the process environment.
    ///
    /// Fails on the first missing or empty variable.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the connection parameters through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ConfigurationError::EnvVarMissing(key.to_string()))
        };

        let environment = require(ENV_TAG_VAR)?;
        let user = require(USER_VAR)?;
        let password = require(PASSWORD_VAR)?;

        let host_var = format!("{}{}", HOST_VAR_PREFIX, environment);
        let port_var = format!("{}{}", PORT_VAR_PREFIX, environment);
        let host = require(&host_var)?;
        let port_raw = require(&port_var)?;
        let port = port_raw.trim().parse::<u16>().map_err(|e| {
            ConfigurationError::invalid_value(&port_var, format!("'{}': {}", port_raw, e))
        })?;

        let database = require(DATABASE_VAR)?;

        Ok(Self {
            environment,
            user,
            password,
            host,
            port,
            database,
        })
    }

    /// sqlx connect options for these parameters
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("environment", &self.environment)
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "postgresql://{}@{}:{}/{} ({})",
            self.user, self.host, self.port, self.database, self.environment
        )
    }
}

/// Open a connection pool for the given parameters
pub async fn connect(config: &ConnectionConfig, settings: &PoolSettings) -> RepositoryResult<PgPool> {
    info!("Connecting to {}", config);

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .connect_with(config.connect_options())
        .await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        [
            ("TRADING_ENV", "DEV"),
            ("TRADING_POSTGRES_USER", "trader"),
            ("TRADING_POSTGRES_PASSWORD", "s3cr3t"),
            ("TRADING_POSTGRES_HOST_DEV", "localhost"),
            ("TRADING_POSTGRES_PORT_DEV", "5433"),
            ("TRADING_POSTGRES_HOST_PROD", "db.internal"),
            ("TRADING_POSTGRES_PORT_PROD", "5432"),
            ("TRADING_POSTGRES_DB", "market"),
        ]
        .into_iter()
        .collect()
    }

    fn lookup_in<'a>(
        env: &'a HashMap<&'static str, &'static str>,
    ) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| env.get(key).map(|v| v.to_string())
    }

    #[test]
    fn test_from_lookup_selects_environment_host_and_port() {
        let env = full_env();
        let config = ConnectionConfig::from_lookup(lookup_in(&env)).unwrap();

        assert_eq!(config.environment, "DEV");
        assert_eq!(config.user, "trader");
        assert_eq!(config.password, "s3cr3t");
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5433);
        assert_eq!(config.database, "market");

        let mut env = full_env();
        env.insert("TRADING_ENV", "PROD");
        let config = ConnectionConfig::from_lookup(lookup_in(&env)).unwrap();
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 5432);
    }

    #[test]
    fn test_missing_variable_fails_fast() {
        for key in [
            "TRADING_ENV",
            "TRADING_POSTGRES_USER",
            "TRADING_POSTGRES_PASSWORD",
            "TRADING_POSTGRES_HOST_DEV",
            "TRADING_POSTGRES_PORT_DEV",
            "TRADING_POSTGRES_DB",
        ] {
            let mut env = full_env();
            env.remove(key);
            let err = ConnectionConfig::from_lookup(lookup_in(&env)).unwrap_err();
            assert_eq!(err, ConfigurationError::EnvVarMissing(key.to_string()));
        }
    }

    #[test]
    fn test_empty_variable_counts_as_missing() {
        let mut env = full_env();
        env.insert("TRADING_POSTGRES_DB", "  ");
        let err = ConnectionConfig::from_lookup(lookup_in(&env)).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::EnvVarMissing("TRADING_POSTGRES_DB".into())
        );
    }

    #[test]
    fn test_host_for_unknown_environment_is_missing() {
        let mut env = full_env();
        env.insert("TRADING_ENV", "STAGING");
        let err = ConnectionConfig::from_lookup(lookup_in(&env)).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::EnvVarMissing("TRADING_POSTGRES_HOST_STAGING".into())
        );
    }

    #[test]
    fn test_invalid_port() {
        let mut env = full_env();
        env.insert("TRADING_POSTGRES_PORT_DEV", "None");
        let err = ConnectionConfig::from_lookup(lookup_in(&env)).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidValue { ref field, .. } if field == "TRADING_POSTGRES_PORT_DEV"
        ));
    }

    #[test]
    fn test_debug_and_display_hide_password() {
        let env = full_env();
        let config = ConnectionConfig::from_lookup(lookup_in(&env)).unwrap();

        let debug = format!("{:?}", config);
        assert!(!debug.contains("s3cr3t"));
        assert!(debug.contains("***"));

        let display = config.to_string();
        assert!(!display.contains("s3cr3t"));
        assert_eq!(display, "postgresql://trader@localhost:5433/market (DEV)");
    }
}
