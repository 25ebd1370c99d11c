// Fixtures shared by the unit tests: fake release tarballs and formulae pinned to them.
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tapkit_common::config::Config;
use tapkit_common::formulary::builtin_formulae;
use tapkit_common::model::{Formula, Sha256Field};
use tar::{Builder, EntryType, Header};

pub(crate) struct ArchiveEntry {
    pub path: String,
    pub data: Vec<u8>,
    pub mode: u32,
    pub link_target: Option<String>,
}

impl ArchiveEntry {
    pub fn file(path: &str, data: &[u8], mode: u32) -> Self {
        Self {
            path: path.to_string(),
            data: data.to_vec(),
            mode,
            link_target: None,
        }
    }

    pub fn symlink(path: &str, target: &str) -> Self {
        Self {
            path: path.to_string(),
            data: Vec::new(),
            mode: 0o777,
            link_target: Some(target.to_string()),
        }
    }
}

fn copy_raw(slot: &mut [u8], value: &str) {
    let bytes = value.as_bytes();
    assert!(bytes.len() < slot.len());
    slot[..bytes.len()].copy_from_slice(bytes);
}

/// Writes a gzip tarball. Names are written raw so hostile paths can be built.
pub(crate) fn write_tar_gz(archive: &Path, entries: &[ArchiveEntry]) {
    let file = File::create(archive).unwrap();
    let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));
    for entry in entries {
        let mut header = Header::new_gnu();
        {
            let gnu = header.as_gnu_mut().unwrap();
            copy_raw(&mut gnu.name, &entry.path);
            if let Some(target) = &entry.link_target {
                copy_raw(&mut gnu.linkname, target);
            }
        }
        header.set_entry_type(if entry.link_target.is_some() {
            EntryType::Symlink
        } else {
            EntryType::Regular
        });
        header.set_size(entry.data.len() as u64);
        header.set_mode(entry.mode);
        header.set_mtime(1_700_000_000);
        header.set_cksum();
        builder.append(&header, entry.data.as_slice()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

pub(crate) const HELP_SCRIPT: &[u8] =
    b"#!/bin/sh\necho \"Usage: docker_janitor [--dryrun|--force] [--scope safe|deep]\"\n";

/// A release tarball shaped like the GitHub tag archive of the given version.
pub(crate) fn janitor_release(dir: &Path, version: &str, script_path: &str) -> PathBuf {
    let archive = dir.join(format!("v{version}.tar.gz"));
    let root = format!("homebrew-docker-janitor-cli-{version}");
    write_tar_gz(
        &archive,
        &[
            ArchiveEntry::file(&format!("{root}/{script_path}"), HELP_SCRIPT, 0o755),
            ArchiveEntry::file(&format!("{root}/lib/logging.sh"), b"log() { :; }\n", 0o644),
            ArchiveEntry::file(&format!("{root}/lib/scope.sh"), b"SCOPE=safe\n", 0o644),
            ArchiveEntry::file(&format!("{root}/README.md"), b"# docker janitor\n", 0o644),
        ],
    );
    archive
}

/// The built-in formula for `version`, pinned to the digest of `archive`
/// and without runtime dependencies.
pub(crate) fn janitor_formula(version: &str, archive: &Path) -> Formula {
    let mut formula = builtin_formulae()
        .into_iter()
        .find(|f| f.version.to_string() == version)
        .unwrap();
    formula.sha256 = Sha256Field::parse(&tapkit_net::compute_sha256(archive).unwrap());
    formula.dependencies.clear();
    formula
}

pub(crate) fn temp_config() -> (tempfile::TempDir, Config) {
    let tmp = tempfile::tempdir().unwrap();
    let config = Config::with_root(tmp.path().join("prefix"));
    fs::create_dir_all(config.tapkit_root()).unwrap();
    (tmp, config)
}
