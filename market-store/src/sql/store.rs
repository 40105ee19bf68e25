use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::template::{SqlTemplate, TemplateError, TemplateKind};

/// Loads recompute templates from a directory
///
/// Templates are re-read on every call so edits on disk take effect on the
/// next job run without restarting anything.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, kind: TemplateKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    /// Read and parse one template
    pub async fn load(&self, kind: TemplateKind) -> Result<SqlTemplate, TemplateError> {
        let path = self.path_for(kind);
        debug!("Loading SQL template {} from {}", kind, path.display());

        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| TemplateError::Io { path, source })?;

        SqlTemplate::parse(kind, &text)
    }

    /// Load every known template, stopping at the first failure
    pub async fn check_all(&self) -> Result<Vec<SqlTemplate>, TemplateError> {
        let mut templates = Vec::with_capacity(TemplateKind::ALL.len());
        for kind in TemplateKind::ALL {
            templates.push(self.load(kind).await?);
        }
        info!(
            "All {} SQL templates in {} are valid",
            templates.len(),
            self.dir.display()
        );
        Ok(templates)
    }
}
