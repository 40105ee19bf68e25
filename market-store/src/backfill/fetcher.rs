//! Re-fetch collaborator for the API backfill

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::info;

use market_common::error::{ErrorCategory, ErrorClassification};

use crate::schema::TimeWindow;

/// Fetch errors
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FetchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Fetch rejected: {0}")]
    Rejected(String),
}

impl ErrorClassification for FetchError {
    fn category(&self) -> ErrorCategory {
        match self {
            FetchError::Io(_) => ErrorCategory::Transient,
            FetchError::Serialization(_) => ErrorCategory::Internal,
            FetchError::Rejected(_) => ErrorCategory::Permanent,
        }
    }
}

/// Something that can reload raw bars for a set of symbols
///
/// Implementations own the network side; the backfill only decides which
/// symbols need reloading.
#[async_trait]
pub trait MarketDataFetcher: Send + Sync {
    /// Reload bars for `symbols` over `window`
    async fn fetch_bars(&self, window: &TimeWindow, symbols: &[String]) -> Result<(), FetchError>;
}

/// JSON document handed to the ingestion job
#[derive(Debug, Serialize)]
pub struct RefetchRequest<'a> {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub symbols: &'a [String],
}

/// Writes the re-fetch request as JSON instead of calling a vendor API
///
/// With no path the document goes to stdout.
#[derive(Debug, Clone, Default)]
pub struct SymbolListExport {
    path: Option<PathBuf>,
}

impl SymbolListExport {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn stdout() -> Self {
        Self { path: None }
    }

    /// Render the request document
    pub fn render(window: &TimeWindow, symbols: &[String]) -> Result<String, FetchError> {
        let request = RefetchRequest {
            start_time: window.start(),
            end_time: window.end(),
            symbols,
        };
        Ok(serde_json::to_string_pretty(&request)?)
    }
}

#[async_trait]
impl MarketDataFetcher for SymbolListExport {
    async fn fetch_bars(&self, window: &TimeWindow, symbols: &[String]) -> Result<(), FetchError> {
        let mut body = Self::render(window, symbols)?;
        body.push('\n');

        match &self.path {
            Some(path) => {
                tokio::fs::write(path, body).await?;
                info!(
                    "Wrote re-fetch request for {} symbols to {}",
                    symbols.len(),
                    path.display()
                );
            }
            None => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(body.as_bytes()).await?;
                stdout.flush().await?;
            }
        }

        Ok(())
    }
}
