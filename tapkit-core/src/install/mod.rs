// tapkit-core/src/install/mod.rs
// verify -> check dependencies -> extract -> map into a staged keg -> swap keg -> link -> receipt

use std::fs;
use std::path::{Path, PathBuf};

use tapkit_common::config::Config;
use tapkit_common::error::{Result, TapkitError};
use tapkit_common::model::{Formula, InstalledArtifact};
use tapkit_net::verify_checksum;
use tracing::{debug, instrument, warn};

pub mod extract;
pub mod link;
pub mod mapping;
pub mod receipt;

use crate::check::dependencies::{check_dependencies, DependencyReport};
use receipt::InstallReceipt;

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Proceed (with a warning) when runtime dependencies are missing.
    pub ignore_dependencies: bool,
}

#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub keg_path: PathBuf,
    pub receipt: InstallReceipt,
    pub dependencies: DependencyReport,
}

/// Installs `formula` from an already downloaded source archive.
///
/// The archive is verified against the formula's checksum first. An existing keg for
/// the same version is replaced wholesale, so repeated installs yield the same layout.
#[instrument(skip_all, fields(formula = %formula.name, version = %formula.version))]
pub fn install_formula(
    formula: &Formula,
    archive_path: &Path,
    config: &Config,
    options: &InstallOptions,
) -> Result<InstallOutcome> {
    formula.validate()?;
    verify_checksum(archive_path, formula.sha256.expected()?)?;
    debug!("Checksum verified for {}", archive_path.display());

    let dependencies = check_dependencies(formula, config)?;
    let dependencies = if options.ignore_dependencies {
        if !dependencies.is_satisfied() {
            warn!(
                "Installing {} without dependencies: {}",
                formula.name,
                dependencies.missing().join(", ")
            );
        }
        dependencies
    } else {
        dependencies.into_result(&formula.name)?
    };
    let missing_optional = dependencies.missing_optional();
    if !missing_optional.is_empty() {
        warn!(
            "Optional dependencies of {} not found: {}",
            formula.name,
            missing_optional.join(", ")
        );
    }

    fs::create_dir_all(config.tmp_dir())?;
    let staging = tempfile::Builder::new()
        .prefix(&format!("{}-", formula.name))
        .tempdir_in(config.tmp_dir())
        .map_err(|e| {
            TapkitError::io(
                format!("Failed to create staging directory in {}", config.tmp_dir().display()),
                e,
            )
        })?;
    let source_root = staging.path().join("source");
    let staged_keg = staging.path().join("keg");

    extract::extract_tar_gz(archive_path, &source_root)?;
    let staged_artifacts = mapping::apply_install_steps(formula, &source_root, &staged_keg)?;

    let keg_path = config.formula_keg_path(&formula.name, &formula.version_str_full());
    replace_keg(&staged_keg, &keg_path)?;

    let mut artifacts: Vec<InstalledArtifact> = staged_artifacts
        .into_iter()
        .map(|artifact| rebase_artifact(artifact, &staged_keg, &keg_path))
        .collect();
    let links = match link::link_formula_artifacts(formula, &keg_path, config) {
        Ok(links) => links,
        Err(e) => {
            discard_keg(&keg_path);
            return Err(e);
        }
    };
    artifacts.extend(links.iter().cloned());

    let receipt = InstallReceipt::new(formula, artifacts);
    if let Err(e) = receipt.write(&keg_path) {
        if let Err(unlink_err) = link::unlink_formula_artifacts(&links) {
            warn!("Failed to unlink {}: {}", formula.name, unlink_err);
        }
        discard_keg(&keg_path);
        return Err(e);
    }
    debug!(
        "Installed {} {} into {}",
        formula.name,
        formula.version,
        keg_path.display()
    );

    Ok(InstallOutcome {
        keg_path,
        receipt,
        dependencies,
    })
}

fn replace_keg(staged_keg: &Path, keg_path: &Path) -> Result<()> {
    if keg_path.exists() {
        debug!("Replacing existing keg {}", keg_path.display());
        if let Ok(old) = InstallReceipt::read(keg_path) {
            let old_links: Vec<InstalledArtifact> = old.links().cloned().collect();
            link::unlink_formula_artifacts(&old_links)?;
        }
        fs::remove_dir_all(keg_path).map_err(|e| {
            TapkitError::InstallError(format!(
                "Failed to remove existing keg {}: {}",
                keg_path.display(),
                e
            ))
        })?;
    }
    if let Some(parent) = keg_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(staged_keg, keg_path).map_err(|e| {
        TapkitError::InstallError(format!(
            "Failed to move staged keg into {}: {}",
            keg_path.display(),
            e
        ))
    })
}

// Removes a keg that never got a receipt, and its cellar dir if now empty.
fn discard_keg(keg_path: &Path) {
    debug!("Discarding incomplete keg {}", keg_path.display());
    if let Err(e) = fs::remove_dir_all(keg_path) {
        warn!("Failed to remove incomplete keg {}: {}", keg_path.display(), e);
        return;
    }
    if let Some(cellar_dir) = keg_path.parent() {
        let is_empty = fs::read_dir(cellar_dir).is_ok_and(|mut d| d.next().is_none());
        if is_empty {
            let _ = fs::remove_dir(cellar_dir);
        }
    }
}

fn rebase_artifact(artifact: InstalledArtifact, from: &Path, to: &Path) -> InstalledArtifact {
    match artifact {
        InstalledArtifact::KegFile { path } => InstalledArtifact::KegFile {
            path: path
                .strip_prefix(from)
                .map(|rel| to.join(rel))
                .unwrap_or(path),
        },
        other => other,
    }
}
