// tapkit-core/src/check/dependencies.rs
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use tapkit_common::config::Config;
use tapkit_common::dependency::DependencyTag;
use tapkit_common::error::{Result, TapkitError};
use tapkit_common::keg::KegRegistry;
use tapkit_common::model::Formula;
use tracing::debug;

/// How a runtime dependency was found, if at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyStatus {
    Keg(PathBuf),
    OnPath(PathBuf),
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEntry {
    pub name: String,
    pub status: DependencyStatus,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyReport {
    pub entries: Vec<DependencyEntry>,
}

impl DependencyReport {
    /// Required dependencies that were not found. Optional ones never count.
    pub fn missing(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| !e.optional && e.status == DependencyStatus::Missing)
            .map(|e| e.name.as_str())
            .collect()
    }

    pub fn missing_optional(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.optional && e.status == DependencyStatus::Missing)
            .map(|e| e.name.as_str())
            .collect()
    }

    pub fn is_satisfied(&self) -> bool {
        self.missing().is_empty()
    }

    /// Turns missing dependencies into a `DependencyError`.
    pub fn into_result(self, formula_name: &str) -> Result<Self> {
        if self.is_satisfied() {
            return Ok(self);
        }
        Err(TapkitError::DependencyError(format!(
            "{formula_name} requires {} which could not be found (install it or put it on PATH)",
            self.missing().join(", ")
        )))
    }
}

// Executables that prove a package is present. GNU coreutils installs
// g-prefixed tools on macOS and unprefixed ones elsewhere.
fn executable_probes(name: &str) -> Vec<String> {
    match name {
        "coreutils" => vec!["gdate".to_string(), "date".to_string()],
        other => vec![other.to_string()],
    }
}

/// Checks every runtime dependency against the Cellar and `PATH`.
pub fn check_dependencies(formula: &Formula, config: &Config) -> Result<DependencyReport> {
    check_dependencies_in(formula, config, std::env::var_os("PATH").as_deref())
}

/// Same as [`check_dependencies`] with an explicit search path.
pub fn check_dependencies_in(
    formula: &Formula,
    config: &Config,
    search_path: Option<&OsStr>,
) -> Result<DependencyReport> {
    let registry = KegRegistry::new(config.clone());
    let prefix_bin: OsString = config.bin_dir().into_os_string();
    let mut joined = prefix_bin;
    if let Some(path) = search_path {
        joined.push(":");
        joined.push(path);
    }
    let cwd = std::env::current_dir()?;

    let mut entries = Vec::new();
    for dep in formula.runtime_dependencies() {
        let status = if let Some(keg) = registry.get_installed_keg(&dep.name)? {
            DependencyStatus::Keg(keg.path)
        } else {
            executable_probes(&dep.name)
                .iter()
                .find_map(|probe| which::which_in(probe, Some(&joined), &cwd).ok())
                .map_or(DependencyStatus::Missing, DependencyStatus::OnPath)
        };
        debug!("Dependency {} of {}: {:?}", dep.name, formula.name, status);
        entries.push(DependencyEntry {
            name: dep.name.clone(),
            status,
            optional: dep.tags.contains(DependencyTag::OPTIONAL),
        });
    }
    Ok(DependencyReport { entries })
}

#[cfg(test)]
mod tests {
    use std::fs;
    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    use tapkit_common::dependency::Dependency;
    use tapkit_common::formulary::builtin_formulae;

    use super::*;
    use crate::test_support::temp_config;

    fn fake_tool(dir: &Path, name: &str) {
        fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, b"#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn all_dependencies_found_on_path() {
        let (tmp, config) = temp_config();
        let tools = tmp.path().join("tools");
        for tool in ["bash", "jq", "date"] {
            fake_tool(&tools, tool);
        }
        let formula = builtin_formulae().remove(1);

        let report = check_dependencies_in(&formula, &config, Some(tools.as_os_str())).unwrap();
        assert!(report.is_satisfied());
        assert_eq!(report.entries[2].name, "coreutils");
        assert_eq!(
            report.entries[2].status,
            DependencyStatus::OnPath(tools.join("date"))
        );
    }

    #[test]
    fn missing_dependency_is_an_error() {
        let (tmp, config) = temp_config();
        let tools = tmp.path().join("tools");
        fake_tool(&tools, "bash");
        fake_tool(&tools, "gdate");
        let formula = builtin_formulae().remove(1);

        let report = check_dependencies_in(&formula, &config, Some(tools.as_os_str())).unwrap();
        assert_eq!(report.missing(), vec!["jq"]);
        let err = report.into_result(&formula.name).unwrap_err();
        assert!(matches!(err, TapkitError::DependencyError(msg) if msg.contains("jq")));
    }

    #[test]
    fn installed_keg_satisfies_dependency() {
        let (tmp, config) = temp_config();
        let tools = tmp.path().join("tools");
        fake_tool(&tools, "bash");
        fake_tool(&tools, "date");
        fs::create_dir_all(config.formula_keg_path("jq", "1.7.1")).unwrap();
        let formula = builtin_formulae().remove(1);

        let report = check_dependencies_in(&formula, &config, Some(tools.as_os_str())).unwrap();
        assert!(report.is_satisfied());
        assert_eq!(
            report.entries[1].status,
            DependencyStatus::Keg(config.formula_keg_path("jq", "1.7.1"))
        );
    }

    #[test]
    fn missing_optional_dependency_does_not_block() {
        let (tmp, config) = temp_config();
        let tools = tmp.path().join("tools");
        for tool in ["bash", "jq", "date"] {
            fake_tool(&tools, tool);
        }
        let mut formula = builtin_formulae().remove(1);
        formula.dependencies.push(Dependency::new_with_tags(
            "tapkit-surely-missing-opt",
            DependencyTag::OPTIONAL,
        ));

        let report = check_dependencies_in(&formula, &config, Some(tools.as_os_str())).unwrap();
        assert_eq!(report.entries.len(), 4);
        assert!(report.entries[3].optional);
        assert_eq!(report.entries[3].status, DependencyStatus::Missing);
        assert!(report.missing().is_empty());
        assert_eq!(report.missing_optional(), vec!["tapkit-surely-missing-opt"]);
        assert!(report.into_result(&formula.name).is_ok());
    }
}
