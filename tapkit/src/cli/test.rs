// tapkit/src/cli/test.rs
use clap::Args;
use colored::Colorize;
use tapkit_common::config::Config;
use tapkit_common::error::{Result, TapkitError};
use tapkit_common::formulary::{parse_formula_spec, Formulary};
use tapkit_common::keg::KegRegistry;
use tapkit_core::run_smoke_test;

use crate::cli::ohai;

#[derive(Args, Debug)]
pub struct TestArgs {
    /// Installed formula to test
    pub formula: String,
}

impl TestArgs {
    pub fn run(&self, config: &Config) -> Result<()> {
        let (spec_name, version) = parse_formula_spec(&self.formula)?;
        let name = spec_name.rsplit('/').next().unwrap_or(spec_name);
        let keg = KegRegistry::new(config.clone())
            .find_installed_keg(name, version.as_ref())?
            .ok_or_else(|| match &version {
                Some(v) => TapkitError::NotFound(format!("{name} {v} is not installed")),
                None => TapkitError::NotFound(format!("{name} is not installed")),
            })?;

        // Test against the definition that matches the installed version.
        let formula = Formulary::new(config.clone())
            .load_formula(&format!("{}@{}", keg.name, keg.version_str))?;

        ohai(&format!("Testing {} {}", formula.name, keg.version_str));
        let report = run_smoke_test(&formula, &keg.path)?;
        println!(
            "{} `{} {}` printed \"{}\"",
            "✓".green(),
            report.command.display(),
            report.args.join(" "),
            report.expect
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn pinned_version_must_be_installed() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_root(tmp.path());
        fs::create_dir_all(config.formula_keg_path("docker-janitor-cli", "1.0.1")).unwrap();

        let cmd = TestArgs {
            formula: "docker-janitor-cli@1.0.0".to_string(),
        };
        let err = cmd.run(&config).unwrap_err();
        assert!(matches!(err, TapkitError::NotFound(msg) if msg.contains("1.0.0")));
    }

    #[cfg(unix)]
    #[test]
    fn pinned_version_tests_that_keg_not_the_newest() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_root(tmp.path());
        for (version, body) in [("1.0.0", "echo 'Usage: docker_janitor'"), ("1.0.1", "exit 1")] {
            let bin = config
                .formula_keg_path("docker-janitor-cli", version)
                .join("bin");
            fs::create_dir_all(&bin).unwrap();
            let script = bin.join("docker_janitor");
            fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        }

        let pinned = TestArgs {
            formula: "docker-janitor-cli@1.0.0".to_string(),
        };
        assert!(pinned.run(&config).is_ok());
        let newest = TestArgs {
            formula: "docker-janitor-cli".to_string(),
        };
        assert!(matches!(
            newest.run(&config),
            Err(TapkitError::TestFailed(_))
        ));
    }
}
