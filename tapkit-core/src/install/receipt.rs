// tapkit-core/src/install/receipt.rs
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tapkit_common::error::{Result, TapkitError};
use tapkit_common::model::{Formula, InstalledArtifact};
use tracing::debug;

pub const RECEIPT_FILE_NAME: &str = "INSTALL_RECEIPT.json";

/// What an install put on disk, stored inside the keg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReceipt {
    pub name: String,
    pub version: String,
    pub source_url: String,
    pub sha256: String,
    pub installed_at: DateTime<Utc>,
    pub artifacts: Vec<InstalledArtifact>,
}

impl InstallReceipt {
    pub fn new(formula: &Formula, artifacts: Vec<InstalledArtifact>) -> Self {
        Self {
            name: formula.name.clone(),
            version: formula.version_str_full(),
            source_url: formula.url.clone(),
            sha256: formula.sha256.to_string(),
            installed_at: Utc::now(),
            artifacts,
        }
    }

    pub fn path_in(keg_path: &Path) -> PathBuf {
        keg_path.join(RECEIPT_FILE_NAME)
    }

    pub fn write(&self, keg_path: &Path) -> Result<()> {
        let receipt_path = Self::path_in(keg_path);
        debug!("Writing install receipt: {}", receipt_path.display());
        let data = serde_json::to_vec_pretty(self)?;
        fs::write(&receipt_path, data).map_err(|e| {
            TapkitError::io(format!("Failed to write receipt {}", receipt_path.display()), e)
        })
    }

    pub fn read(keg_path: &Path) -> Result<Self> {
        let receipt_path = Self::path_in(keg_path);
        let data = fs::read(&receipt_path).map_err(|e| {
            TapkitError::NotFound(format!(
                "No install receipt at {}: {}",
                receipt_path.display(),
                e
            ))
        })?;
        Ok(serde_json::from_slice(&data)?)
    }

    pub fn links(&self) -> impl Iterator<Item = &InstalledArtifact> {
        self.artifacts.iter().filter(|a| a.link_path().is_some())
    }
}
