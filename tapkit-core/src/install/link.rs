// tapkit-core/src/install/link.rs
use std::fs;
#[cfg(unix)]
use std::os::unix::fs as unix_fs;
use std::path::Path;

use tapkit_common::config::Config;
use tapkit_common::error::{Result, TapkitError};
use tapkit_common::model::{Formula, InstalledArtifact};
use tracing::{debug, warn};

/// Points `opt/<name>` at the keg and exposes each installed binary in the prefix `bin/`.
pub fn link_formula_artifacts(
    formula: &Formula,
    keg_path: &Path,
    config: &Config,
) -> Result<Vec<InstalledArtifact>> {
    debug!(
        "Linking artifacts for {} from {}",
        formula.name(),
        keg_path.display()
    );
    let mut links = Vec::new();
    if let Err(e) = link_into(formula, keg_path, config, &mut links) {
        // Leave nothing half-linked behind.
        if let Err(cleanup_err) = unlink_formula_artifacts(&links) {
            warn!(
                "Failed to remove partial links for {}: {}",
                formula.name(),
                cleanup_err
            );
        }
        return Err(e);
    }
    Ok(links)
}

fn link_into(
    formula: &Formula,
    keg_path: &Path,
    config: &Config,
    links: &mut Vec<InstalledArtifact>,
) -> Result<()> {
    let opt_link_path = config.formula_opt_path(formula.name());
    fs::create_dir_all(config.opt_dir())?;
    replace_with_symlink(keg_path, &opt_link_path)?;
    links.push(InstalledArtifact::OptLink {
        link_path: opt_link_path,
        target_path: keg_path.to_path_buf(),
    });

    let target_bin_dir = config.bin_dir();
    fs::create_dir_all(&target_bin_dir)?;
    for bin_name in formula.bin_names() {
        let source = keg_path.join("bin").join(&bin_name);
        if !source.is_file() {
            return Err(TapkitError::InstallError(format!(
                "Expected installed binary {} before linking",
                source.display()
            )));
        }
        let link_path = target_bin_dir.join(&bin_name);
        replace_with_symlink(&source, &link_path)?;
        debug!("  Linked {} -> {}", link_path.display(), source.display());
        links.push(InstalledArtifact::BinaryLink {
            link_path,
            target_path: source,
        });
    }
    Ok(())
}

/// Removes link artifacts, but only where they still point where the receipt says.
pub fn unlink_formula_artifacts(artifacts: &[InstalledArtifact]) -> Result<usize> {
    let mut removed = 0;
    for artifact in artifacts {
        let (link_path, target_path) = match artifact {
            InstalledArtifact::BinaryLink {
                link_path,
                target_path,
            }
            | InstalledArtifact::OptLink {
                link_path,
                target_path,
            } => (link_path, target_path),
            InstalledArtifact::KegFile { .. } => continue,
        };
        match fs::read_link(link_path) {
            Ok(current) if current == *target_path => {
                fs::remove_file(link_path)?;
                debug!("Removed link {}", link_path.display());
                removed += 1;
            }
            Ok(current) => warn!(
                "Leaving {} in place: it now points to {}",
                link_path.display(),
                current.display()
            ),
            Err(e) => debug!("Link {} not present: {}", link_path.display(), e),
        }
    }
    Ok(removed)
}

fn replace_with_symlink(target: &Path, link: &Path) -> Result<()> {
    if let Ok(meta) = link.symlink_metadata() {
        if meta.is_dir() && !meta.file_type().is_symlink() {
            return Err(TapkitError::InstallError(format!(
                "Refusing to replace directory {} with a link",
                link.display()
            )));
        }
        fs::remove_file(link)?;
    }
    #[cfg(unix)]
    unix_fs::symlink(target, link).map_err(|e| {
        TapkitError::io(format!("Failed to link {} -> {}", link.display(), target.display()), e)
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tapkit_common::formulary::builtin_formulae;

    use super::*;
    use crate::test_support::temp_config;

    #[test]
    fn links_opt_and_bin_then_unlinks() {
        let (_tmp, config) = temp_config();
        let formula = builtin_formulae().remove(1);
        let keg = config.formula_keg_path(&formula.name, "1.0.1");
        fs::create_dir_all(keg.join("bin")).unwrap();
        fs::write(keg.join("bin/docker_janitor"), b"#!/bin/sh\n").unwrap();

        let links = link_formula_artifacts(&formula, &keg, &config).unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(
            fs::read_link(config.bin_dir().join("docker_janitor")).unwrap(),
            keg.join("bin/docker_janitor")
        );
        assert_eq!(
            fs::read_link(config.formula_opt_path(&formula.name)).unwrap(),
            keg
        );

        // Relinking over existing links is fine.
        link_formula_artifacts(&formula, &keg, &config).unwrap();

        assert_eq!(unlink_formula_artifacts(&links).unwrap(), 2);
        assert!(config.bin_dir().join("docker_janitor").symlink_metadata().is_err());
    }

    #[test]
    fn failed_link_removes_partial_links() {
        let (_tmp, config) = temp_config();
        let formula = builtin_formulae().remove(1);
        let keg = config.formula_keg_path(&formula.name, "1.0.1");
        fs::create_dir_all(keg.join("bin")).unwrap();
        fs::write(keg.join("bin/docker_janitor"), b"#!/bin/sh\n").unwrap();
        fs::create_dir_all(config.bin_dir().join("docker_janitor")).unwrap();

        let err = link_formula_artifacts(&formula, &keg, &config).unwrap_err();
        assert!(matches!(err, TapkitError::InstallError(_)));
        assert!(config
            .formula_opt_path(&formula.name)
            .symlink_metadata()
            .is_err());
        assert!(config.bin_dir().join("docker_janitor").is_dir());
    }

    #[test]
    fn foreign_links_survive_unlink() {
        let (_tmp, config) = temp_config();
        let link_path = config.bin_dir().join("docker_janitor");
        fs::create_dir_all(config.bin_dir()).unwrap();
        unix_fs::symlink("/usr/bin/true", &link_path).unwrap();

        let stale = vec![InstalledArtifact::BinaryLink {
            link_path: link_path.clone(),
            target_path: "/somewhere/else".into(),
        }];
        assert_eq!(unlink_formula_artifacts(&stale).unwrap(), 0);
        assert!(link_path.symlink_metadata().is_ok());
    }
}
