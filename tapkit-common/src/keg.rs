// tapkit-common/src/keg.rs
use std::fs;
use std::path::PathBuf;

use semver::Version;
use tracing::{debug, warn};

use super::config::Config;
use super::error::{Result, TapkitError};
use super::model::formula::parse_version;

/// An installed formula version (a keg) in the Cellar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledKeg {
    pub name: String,
    pub version_str: String,
    pub path: PathBuf,
}

/// Queries installed kegs in the Cellar.
#[derive(Debug)]
pub struct KegRegistry {
    config: Config,
}

impl KegRegistry {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn cellar_path(&self) -> PathBuf {
        self.config.cellar_dir()
    }

    fn kegs_in(&self, name: &str) -> Result<Vec<InstalledKeg>> {
        let formula_dir = self.config.formula_cellar_dir(name);
        if !formula_dir.is_dir() {
            debug!(
                "[KEG_REGISTRY:{}] No cellar directory at {}",
                name,
                formula_dir.display()
            );
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&formula_dir).map_err(|e| {
            TapkitError::io(format!("Failed to read cellar directory {}", formula_dir.display()), e)
        })?;

        let mut kegs = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(
                        "[KEG_REGISTRY:{}] Error reading entry in {}: {}. Skipping.",
                        name,
                        formula_dir.display(),
                        e
                    );
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if let Some(version_str) = path.file_name().and_then(|n| n.to_str()) {
                kegs.push(InstalledKeg {
                    name: name.to_string(),
                    version_str: version_str.to_string(),
                    path: path.clone(),
                });
            }
        }
        kegs.sort_by(|a, b| keg_order(&a.version_str, &b.version_str));
        Ok(kegs)
    }

    /// The newest installed keg of `name`, if any.
    pub fn get_installed_keg(&self, name: &str) -> Result<Option<InstalledKeg>> {
        let latest = self.kegs_in(name)?.pop();
        if let Some(keg) = &latest {
            debug!(
                "[KEG_REGISTRY:{}] Latest keg: {} ({})",
                name,
                keg.version_str,
                keg.path.display()
            );
        }
        Ok(latest)
    }

    /// The installed keg of `name` at `version`, or the newest one when no version is given.
    pub fn find_installed_keg(
        &self,
        name: &str,
        version: Option<&Version>,
    ) -> Result<Option<InstalledKeg>> {
        let Some(version) = version else {
            return self.get_installed_keg(name);
        };
        Ok(self
            .kegs_in(name)?
            .into_iter()
            .find(|keg| parse_version(&keg.version_str).is_ok_and(|v| v == *version)))
    }

    pub fn list_installed_kegs(&self) -> Result<Vec<InstalledKeg>> {
        let cellar_dir = self.cellar_path();
        if !cellar_dir.is_dir() {
            debug!("[KEG_REGISTRY] Cellar directory not found. Returning empty list.");
            return Ok(Vec::new());
        }

        let mut names: Vec<String> = fs::read_dir(&cellar_dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect();
        names.sort();

        let mut installed = Vec::new();
        for name in names {
            installed.extend(self.kegs_in(&name)?);
        }
        debug!("[KEG_REGISTRY] Found {} installed kegs.", installed.len());
        Ok(installed)
    }
}

// Semver order where both sides parse, lexicographic otherwise.
fn keg_order(a: &str, b: &str) -> std::cmp::Ordering {
    match (parse_version(a), parse_version(b)) {
        (Ok(va), Ok(vb)) => va.cmp(&vb),
        _ => a.cmp(b),
    }
}
