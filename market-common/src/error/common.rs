//! Common error types shared across crates.
//!
//! Crate-specific errors wrap these using `#[from]`.

use thiserror::Error;

/// Configuration-related errors.
///
/// Use this for configuration loading, parsing, and validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// Field has invalid value
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// Environment variable not set
    #[error("Environment variable not set: {0}")]
    EnvVarMissing(String),
}

impl ConfigurationError {
    /// Create an InvalidValue error
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigurationError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_display() {
        let err = ConfigurationError::EnvVarMissing("TRADING_POSTGRES_DB".to_string());
        assert_eq!(
            err.to_string(),
            "Environment variable not set: TRADING_POSTGRES_DB"
        );

        let err = ConfigurationError::invalid_value("TRADING_POSTGRES_PORT_DEV", "not a port");
        assert_eq!(
            err.to_string(),
            "Invalid value for 'TRADING_POSTGRES_PORT_DEV': not a port"
        );
    }
}
