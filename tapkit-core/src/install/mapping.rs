// tapkit-core/src/install/mapping.rs
// Applies a formula's install mapping: archive paths -> keg paths.
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Path, PathBuf};

use tapkit_common::error::{Result, TapkitError};
use tapkit_common::model::{Formula, InstallStep, InstalledArtifact};
use tracing::debug;
use walkdir::WalkDir;

/// Copies every mapped source under `source_root` into `keg_path`.
///
/// Fails with `NotFound` when a declared source path (or a lib glob) has no match.
pub fn apply_install_steps(
    formula: &Formula,
    source_root: &Path,
    keg_path: &Path,
) -> Result<Vec<InstalledArtifact>> {
    let mut artifacts = Vec::new();
    for step in &formula.install {
        match step {
            InstallStep::Bin { source, .. } => {
                let bin_name = step.bin_name().ok_or_else(|| {
                    TapkitError::InstallError(format!(
                        "Cannot derive a binary name from '{}'",
                        source.display()
                    ))
                })?;
                let dest = keg_path.join("bin").join(&bin_name);
                install_bin(&source_root.join(source), &dest)?;
                artifacts.push(InstalledArtifact::KegFile { path: dest });
            }
            InstallStep::Lib { pattern } => {
                let lib_dir = keg_path.join("lib");
                for matched in glob_in(source_root, pattern)? {
                    let file_name = matched.file_name().ok_or_else(|| {
                        TapkitError::InstallError(format!(
                            "Glob match {} has no file name",
                            matched.display()
                        ))
                    })?;
                    let dest = lib_dir.join(file_name);
                    artifacts.extend(copy_tree(&matched, &dest)?);
                }
            }
        }
    }
    debug!(
        "Installed {} files for {} into {}",
        artifacts.len(),
        formula.name,
        keg_path.display()
    );
    Ok(artifacts)
}

fn install_bin(source: &Path, dest: &Path) -> Result<()> {
    if !source.is_file() {
        return Err(TapkitError::NotFound(format!(
            "Declared binary {} is missing from the source archive",
            source.display()
        )));
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    debug!("Installing {} -> {}", source.display(), dest.display());
    fs::copy(source, dest).map_err(|e| {
        TapkitError::io(format!("Failed to copy {} to {}", source.display(), dest.display()), e)
    })?;
    #[cfg(unix)]
    fs::set_permissions(dest, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

fn glob_in(source_root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let escaped_root = glob::Pattern::escape(&source_root.to_string_lossy());
    let full_pattern = format!("{}/{}", escaped_root.trim_end_matches('/'), pattern);
    let mut matches: Vec<PathBuf> = glob::glob(&full_pattern)
        .map_err(|e| {
            TapkitError::ValidationError(format!("Invalid install pattern '{pattern}': {e}"))
        })?
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| TapkitError::io(format!("Failed to expand '{pattern}'"), e.into_error()))?;
    matches.sort();
    if matches.is_empty() {
        return Err(TapkitError::NotFound(format!(
            "Install pattern '{pattern}' matched nothing in the source archive"
        )));
    }
    Ok(matches)
}

fn copy_tree(source: &Path, dest: &Path) -> Result<Vec<InstalledArtifact>> {
    let mut copied = Vec::new();
    for entry in WalkDir::new(source).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            TapkitError::io(format!("Failed to walk {}", source.display()), e.into())
        })?;
        let relative = entry.path().strip_prefix(source).map_err(|e| {
            TapkitError::Generic(format!("Unexpected path {}: {e}", entry.path().display()))
        })?;
        let target = if relative.as_os_str().is_empty() {
            dest.to_path_buf()
        } else {
            dest.join(relative)
        };
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        if file_type.is_symlink() {
            #[cfg(unix)]
            {
                let link_target = fs::read_link(entry.path())?;
                if target.symlink_metadata().is_ok() {
                    fs::remove_file(&target)?;
                }
                symlink(&link_target, &target)?;
            }
        } else {
            fs::copy(entry.path(), &target).map_err(|e| {
                TapkitError::io(
                    format!("Failed to copy {} to {}", entry.path().display(), target.display()),
                    e,
                )
            })?;
        }
        copied.push(InstalledArtifact::KegFile { path: target });
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use tapkit_common::formulary::builtin_formulae;

    use super::*;

    fn source_tree(root: &Path, script: &str) {
        fs::create_dir_all(root.join("bin")).unwrap();
        fs::create_dir_all(root.join("lib/helpers")).unwrap();
        fs::write(root.join(script), b"#!/bin/sh\necho Usage\n").unwrap();
        fs::write(root.join("lib/logging.sh"), b"log() { :; }\n").unwrap();
        fs::write(root.join("lib/helpers/scope.sh"), b"SCOPE=safe\n").unwrap();
    }

    #[test]
    fn each_version_maps_its_script_to_docker_janitor() {
        for (formula, script) in builtin_formulae()
            .into_iter()
            .zip(["bin/docker_janitor.sh", "bin/docker_janitor"])
        {
            let tmp = tempfile::tempdir().unwrap();
            let src = tmp.path().join("src");
            let keg = tmp.path().join("keg");
            source_tree(&src, script);

            let artifacts = apply_install_steps(&formula, &src, &keg).unwrap();

            let bin = keg.join("bin/docker_janitor");
            assert!(bin.is_file(), "missing bin for {}", formula.version);
            #[cfg(unix)]
            assert_eq!(fs::metadata(&bin).unwrap().permissions().mode() & 0o777, 0o755);
            assert!(keg.join("lib/logging.sh").is_file());
            assert!(keg.join("lib/helpers/scope.sh").is_file());
            assert!(artifacts.contains(&InstalledArtifact::KegFile { path: bin }));
        }
    }

    #[test]
    fn missing_declared_source_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        // 1.0.1 expects bin/docker_janitor; provide only the 1.0.0 name.
        source_tree(&src, "bin/docker_janitor.sh");
        let formula = builtin_formulae().remove(1);

        let err = apply_install_steps(&formula, &src, &tmp.path().join("keg")).unwrap_err();
        assert!(matches!(err, TapkitError::NotFound(_)));
    }

    #[test]
    fn empty_lib_glob_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("bin")).unwrap();
        fs::write(src.join("bin/docker_janitor"), b"#!/bin/sh\n").unwrap();
        let formula = builtin_formulae().remove(1);

        let err = apply_install_steps(&formula, &src, &tmp.path().join("keg")).unwrap_err();
        assert!(matches!(err, TapkitError::NotFound(msg) if msg.contains("lib/*")));
    }
}
