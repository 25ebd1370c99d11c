// tapkit-common/src/model/artifact.rs
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// An item placed on disk by an install, recorded in the keg's receipt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InstalledArtifact {
    /// A file copied into the keg (bin/ or lib/).
    KegFile { path: PathBuf },
    /// A command-line binary symlinked into the prefix's bin dir.
    BinaryLink {
        link_path: PathBuf,
        target_path: PathBuf,
    },
    /// The `opt/<name>` symlink pointing at the keg.
    OptLink {
        link_path: PathBuf,
        target_path: PathBuf,
    },
}

impl InstalledArtifact {
    /// Paths outside the keg that must be removed on uninstall.
    pub fn link_path(&self) -> Option<&PathBuf> {
        match self {
            Self::BinaryLink { link_path, .. } | Self::OptLink { link_path, .. } => Some(link_path),
            Self::KegFile { .. } => None,
        }
    }
}
