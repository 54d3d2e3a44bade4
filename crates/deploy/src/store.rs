//! Persistence of the [`DeploymentRecord`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::record::DeploymentRecord;

/// Default location of the deployment record, relative to the project root.
pub const DEFAULT_RECORD_PATH: &str = "deployment-info.json";

/// Stores one deployment record as a JSON document at a fixed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentStore {
    path: PathBuf,
}

impl DeploymentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the stored record.
    ///
    /// The document is written to a sibling temporary file and renamed over the
    /// target, so readers see either the old record or the new one.
    pub fn save(&self, record: &DeploymentRecord) -> Result<()> {
        let json = serde_json::to_string_pretty(record)
            .context("Failed to serialize deployment record")?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context(format!(
                "Failed to create directory {}",
                parent.display()
            ))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, json).context(format!(
            "Failed to write deployment record to {}",
            temp_path.display()
        ))?;
        std::fs::rename(&temp_path, &self.path).context(format!(
            "Failed to move deployment record into place at {}",
            self.path.display()
        ))?;

        tracing::info!(path = %self.path.display(), "Deployment record saved");
        Ok(())
    }

    /// Load the stored record, `None` when nothing has been saved yet.
    pub fn load(&self) -> Result<Option<DeploymentRecord>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No deployment record found");
                return Ok(None);
            }
            Err(e) => {
                return Err(e).context(format!(
                    "Failed to read deployment record from {}",
                    self.path.display()
                ));
            }
        };

        let record = serde_json::from_str(&content).context(format!(
            "Failed to parse deployment record at {}",
            self.path.display()
        ))?;

        Ok(Some(record))
    }
}

impl Default for DeploymentStore {
    fn default() -> Self {
        Self::new(DEFAULT_RECORD_PATH)
    }
}
