//! Error classification traits for retry decisions and reporting.
//!
//! These traits allow errors to self-describe their characteristics so that
//! callers can decide whether re-running an operation makes sense.

use std::time::Duration;

use super::common::ConfigurationError;

/// Classification of error types for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transient errors that may resolve on retry (network issues, deadlocks)
    Transient,
    /// Permanent errors that won't resolve on retry (bad SQL, invalid input)
    Permanent,
    /// Resource exhaustion errors (pool exhausted)
    ResourceExhausted,
    /// Configuration errors (missing env vars, invalid settings)
    Configuration,
    /// Internal errors (bugs, unexpected state)
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Permanent => "permanent",
            ErrorCategory::ResourceExhausted => "resource_exhausted",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for errors that can classify themselves.
///
/// # Example
///
/// ```rust,ignore
/// use market_common::error::ErrorClassification;
///
/// if let Err(e) = executor.run_backfill_fact_stock_bars(window).await {
///     if e.is_transient() {
///         // the whole operation can be re-invoked, the delete step is idempotent
///     }
/// }
/// ```
pub trait ErrorClassification {
    /// Returns the category of this error
    fn category(&self) -> ErrorCategory;

    /// Returns true if this error is transient and may succeed on retry
    fn is_transient(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Transient | ErrorCategory::ResourceExhausted
        )
    }

    /// Returns true if this error is permanent and won't succeed on retry
    fn is_permanent(&self) -> bool {
        matches!(self.category(), ErrorCategory::Permanent)
    }

    /// Suggests a delay before retrying, if applicable
    fn suggested_retry_delay(&self) -> Option<Duration> {
        match self.category() {
            ErrorCategory::Transient => Some(Duration::from_millis(100)),
            ErrorCategory::ResourceExhausted => Some(Duration::from_secs(1)),
            _ => None,
        }
    }
}

impl ErrorClassification for ConfigurationError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

impl ErrorClassification for sqlx::Error {
    fn category(&self) -> ErrorCategory {
        match self {
            sqlx::Error::PoolTimedOut => ErrorCategory::ResourceExhausted,
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolClosed => {
                ErrorCategory::Transient
            }
            sqlx::Error::Configuration(_) => ErrorCategory::Configuration,
            sqlx::Error::Database(db_err) => db_err
                .code()
                .map(|code| sqlstate_category(&code))
                .unwrap_or(ErrorCategory::Permanent),
            sqlx::Error::Protocol(_) | sqlx::Error::WorkerCrashed => ErrorCategory::Internal,
            _ => ErrorCategory::Permanent,
        }
    }

    fn suggested_retry_delay(&self) -> Option<Duration> {
        match self {
            sqlx::Error::PoolTimedOut => Some(Duration::from_millis(500)),
            sqlx::Error::Io(_) => Some(Duration::from_secs(1)),
            sqlx::Error::Database(_) if self.is_transient() => Some(Duration::from_millis(50)),
            _ => None,
        }
    }
}

/// Map a PostgreSQL SQLSTATE code to a category.
///
/// Class 08 is connection exceptions, 40001/40P01 are serialization failure
/// and deadlock, 57014 is a cancelled statement, 53xxx is insufficient
/// resources.
pub fn sqlstate_category(code: &str) -> ErrorCategory {
    match code {
        "40001" | "40P01" | "57014" => ErrorCategory::Transient,
        c if c.starts_with("08") => ErrorCategory::Transient,
        c if c.starts_with("53") => ErrorCategory::ResourceExhausted,
        _ => ErrorCategory::Permanent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_is_not_retryable() {
        let err = ConfigurationError::EnvVarMissing("TRADING_ENV".into());
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(!err.is_transient());
        assert!(!err.is_permanent());
        assert_eq!(err.suggested_retry_delay(), None);
    }

    #[test]
    fn test_sqlx_pool_timeout_is_resource_exhausted() {
        let err = sqlx::Error::PoolTimedOut;
        assert_eq!(err.category(), ErrorCategory::ResourceExhausted);
        assert!(err.is_transient());
        assert_eq!(err.suggested_retry_delay(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_sqlx_row_not_found_is_permanent() {
        let err = sqlx::Error::RowNotFound;
        assert!(err.is_permanent());
        assert_eq!(err.suggested_retry_delay(), None);
    }

    #[test]
    fn test_sqlstate_category() {
        assert_eq!(sqlstate_category("40P01"), ErrorCategory::Transient);
        assert_eq!(sqlstate_category("40001"), ErrorCategory::Transient);
        assert_eq!(sqlstate_category("08006"), ErrorCategory::Transient);
        assert_eq!(sqlstate_category("53300"), ErrorCategory::ResourceExhausted);
        // undefined_table
        assert_eq!(sqlstate_category("42P01"), ErrorCategory::Permanent);
        // division_by_zero
        assert_eq!(sqlstate_category("22012"), ErrorCategory::Permanent);
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::ResourceExhausted.to_string(), "resource_exhausted");
        assert_eq!(ErrorCategory::Transient.as_str(), "transient");
    }
}
