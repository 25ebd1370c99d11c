// tapkit-core/src/uninstall.rs
use std::fs;
use std::path::PathBuf;

use tapkit_common::config::Config;
use tapkit_common::error::{Result, TapkitError};
use tapkit_common::keg::{InstalledKeg, KegRegistry};
use tracing::{debug, warn};

use crate::install::link::unlink_formula_artifacts;
use crate::install::receipt::InstallReceipt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallReport {
    pub name: String,
    pub version: String,
    pub keg_path: PathBuf,
    pub links_removed: usize,
}

/// Removes every installed version of `name`: links first, then the kegs.
pub fn uninstall_formula(name: &str, config: &Config) -> Result<Vec<UninstallReport>> {
    if name.is_empty() || name.contains('/') || name.contains("..") {
        return Err(TapkitError::ValidationError(format!(
            "Invalid formula name '{name}'"
        )));
    }
    let registry = KegRegistry::new(config.clone());
    let kegs: Vec<InstalledKeg> = registry
        .list_installed_kegs()?
        .into_iter()
        .filter(|keg| keg.name == name)
        .collect();
    if kegs.is_empty() {
        return Err(TapkitError::NotFound(format!("{name} is not installed")));
    }

    let mut reports = Vec::new();
    for keg in kegs {
        let links_removed = match InstallReceipt::read(&keg.path) {
            Ok(receipt) => {
                let links: Vec<_> = receipt.links().cloned().collect();
                unlink_formula_artifacts(&links)?
            }
            Err(e) => {
                warn!(
                    "No readable receipt in {} ({}); removing keg without unlinking",
                    keg.path.display(),
                    e
                );
                0
            }
        };
        debug!("Removing keg directory: {}", keg.path.display());
        fs::remove_dir_all(&keg.path).map_err(|e| {
            TapkitError::InstallError(format!(
                "Failed to remove keg directory {}: {}",
                keg.path.display(),
                e
            ))
        })?;
        reports.push(UninstallReport {
            name: keg.name,
            version: keg.version_str,
            keg_path: keg.path,
            links_removed,
        });
    }

    let cellar_dir = config.formula_cellar_dir(name);
    if cellar_dir.is_dir() && fs::read_dir(&cellar_dir)?.next().is_none() {
        fs::remove_dir(&cellar_dir)?;
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::{install_formula, InstallOptions};
    use crate::test_support::{janitor_formula, janitor_release, temp_config};

    #[test]
    fn uninstall_removes_keg_and_links() {
        let (tmp, config) = temp_config();
        let archive = janitor_release(tmp.path(), "1.0.1", "bin/docker_janitor");
        let formula = janitor_formula("1.0.1", &archive);
        install_formula(&formula, &archive, &config, &InstallOptions::default()).unwrap();

        let reports = uninstall_formula("docker-janitor-cli", &config).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].version, "1.0.1");
        assert_eq!(reports[0].links_removed, 2);
        assert!(!config.formula_cellar_dir("docker-janitor-cli").exists());
        assert!(config
            .bin_dir()
            .join("docker_janitor")
            .symlink_metadata()
            .is_err());
        assert!(config
            .formula_opt_path("docker-janitor-cli")
            .symlink_metadata()
            .is_err());
    }

    #[test]
    fn uninstalling_absent_formula_is_not_found() {
        let (_tmp, config) = temp_config();
        assert!(matches!(
            uninstall_formula("docker-janitor-cli", &config),
            Err(TapkitError::NotFound(_))
        ));
        assert!(matches!(
            uninstall_formula("../etc", &config),
            Err(TapkitError::ValidationError(_))
        ));
    }
}
