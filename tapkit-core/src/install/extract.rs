// tapkit-core/src/install/extract.rs
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tapkit_common::error::{Result, TapkitError};
use tar::{Archive, EntryType};
use tracing::{debug, error};

/// Single top-level directory shared by every entry, as in GitHub tag archives.
pub(crate) fn infer_archive_root_dir(archive_path: &Path) -> Result<Option<PathBuf>> {
    debug!(
        "Inferring root directory for archive: {}",
        archive_path.display()
    );
    let file = File::open(archive_path)?;
    infer_tar_root(GzDecoder::new(file), archive_path)
}

fn infer_tar_root<R: Read>(reader: R, archive_path_for_log: &Path) -> Result<Option<PathBuf>> {
    let mut archive = Archive::new(reader);
    let mut unique_roots = HashSet::new();
    let mut saw_nested_entry = false;

    for entry_result in archive.entries()? {
        let entry = entry_result.map_err(|e| {
            TapkitError::Generic(format!(
                "Error reading TAR entry from {}: {}",
                archive_path_for_log.display(),
                e
            ))
        })?;
        // pax global headers carry no path of their own
        if entry.header().entry_type() == EntryType::XGlobalHeader {
            continue;
        }
        let path = entry
            .path()
            .map_err(|e| {
                TapkitError::Generic(format!(
                    "Invalid path in TAR entry from {}: {}",
                    archive_path_for_log.display(),
                    e
                ))
            })?
            .into_owned();

        let mut components = path
            .components()
            .filter(|c| !matches!(c, Component::CurDir));
        match components.next() {
            Some(Component::Normal(name)) => {
                unique_roots.insert(PathBuf::from(name));
                if components.next().is_some() {
                    saw_nested_entry = true;
                } else if !entry.header().entry_type().is_dir() {
                    // A top-level file means there is no wrapping directory.
                    return Ok(None);
                }
            }
            Some(_) => return Ok(None),
            None => continue,
        }
        if unique_roots.len() > 1 {
            debug!(
                "Multiple top-level items found in {}, not stripping.",
                archive_path_for_log.display()
            );
            return Ok(None);
        }
    }

    if unique_roots.len() == 1 && saw_nested_entry {
        Ok(unique_roots.into_iter().next())
    } else {
        Ok(None)
    }
}

/// Unpacks a gzip tarball into `target_dir`, stripping a lone wrapping directory.
///
/// Entries that would land outside `target_dir` abort the extraction.
pub fn extract_tar_gz(archive_path: &Path, target_dir: &Path) -> Result<()> {
    let strip_components = usize::from(infer_archive_root_dir(archive_path)?.is_some());
    debug!(
        "Extracting archive '{}' to '{}' (strip_components={})",
        archive_path.display(),
        target_dir.display(),
        strip_components
    );
    fs::create_dir_all(target_dir)?;

    let file = File::open(archive_path).map_err(|e| {
        TapkitError::io(format!("Failed to open archive {}", archive_path.display()), e)
    })?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);

    for entry_result in archive.entries()? {
        let mut entry = entry_result.map_err(|e| {
            TapkitError::Generic(format!(
                "Error reading TAR entry from {}: {}",
                archive_path.display(),
                e
            ))
        })?;
        if entry.header().entry_type() == EntryType::XGlobalHeader {
            continue;
        }
        let original_path: PathBuf = entry
            .path()
            .map_err(|e| {
                TapkitError::Generic(format!(
                    "Invalid path in TAR entry from {}: {}",
                    archive_path.display(),
                    e
                ))
            })?
            .into_owned();

        let mut target_path = target_dir.to_path_buf();
        let mut pushed_any = false;
        for comp in original_path
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .skip(strip_components)
        {
            match comp {
                Component::Normal(p) => {
                    target_path.push(p);
                    pushed_any = true;
                }
                other => {
                    let msg = format!(
                        "Disallowed component {:?} in TAR path {} from {}",
                        other,
                        original_path.display(),
                        archive_path.display()
                    );
                    error!("{}", msg);
                    return Err(TapkitError::ValidationError(msg));
                }
            }
        }
        if !pushed_any {
            continue;
        }

        let relative_path = target_path
            .strip_prefix(target_dir)
            .map(Path::to_path_buf)
            .map_err(|e| TapkitError::Generic(format!("Unexpected extraction path: {e}")))?;
        reject_symlinked_ancestors(target_dir, &relative_path, archive_path)?;

        match entry.header().entry_type() {
            EntryType::Link => {
                return Err(TapkitError::ValidationError(format!(
                    "Hardlink entry {} in {} is not supported",
                    original_path.display(),
                    archive_path.display()
                )));
            }
            EntryType::Symlink => {
                let link_target = entry
                    .link_name()
                    .map_err(|e| {
                        TapkitError::Generic(format!(
                            "Invalid link target for {} in {}: {}",
                            original_path.display(),
                            archive_path.display(),
                            e
                        ))
                    })?
                    .map(|t| t.into_owned())
                    .unwrap_or_default();
                if !link_stays_inside(&relative_path, &link_target) {
                    let msg = format!(
                        "Symlink {} -> {} in {} points outside the archive",
                        original_path.display(),
                        link_target.display(),
                        archive_path.display()
                    );
                    error!("{}", msg);
                    return Err(TapkitError::ValidationError(msg));
                }
            }
            _ => {}
        }

        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&target_path).map_err(|e| {
            TapkitError::io(
                format!(
                    "Failed to unpack {} to {}",
                    original_path.display(),
                    target_path.display()
                ),
                e,
            )
        })?;
        debug!("Unpacked TAR entry to: {}", target_path.display());
    }
    Ok(())
}

// Refuses to write through a symlink created by an earlier entry.
fn reject_symlinked_ancestors(
    target_dir: &Path,
    relative_path: &Path,
    archive_path: &Path,
) -> Result<()> {
    let mut current = target_dir.to_path_buf();
    let parents = relative_path.parent().map(Path::components);
    for comp in parents.into_iter().flatten() {
        current.push(comp);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                let msg = format!(
                    "Entry {} in {} would be written through symlink {}",
                    relative_path.display(),
                    archive_path.display(),
                    current.display()
                );
                error!("{}", msg);
                return Err(TapkitError::ValidationError(msg));
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
    Ok(())
}

/// Whether `link_target`, resolved from the directory holding `link_path`,
/// stays within the extraction root. Both paths are relative to that root.
fn link_stays_inside(link_path: &Path, link_target: &Path) -> bool {
    let mut depth = link_path
        .parent()
        .map_or(0, |p| p.components().count());
    for comp in link_target.components() {
        match comp {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    !link_target.as_os_str().is_empty()
}
