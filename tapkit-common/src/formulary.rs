// tapkit-common/src/formulary.rs
use std::collections::BTreeMap;

use semver::Version;
use tracing::debug;

use super::config::Config;
use super::dependency::Dependency;
use super::error::{Result, TapkitError};
use super::model::formula::{parse_version, Formula, InstallStep, Sha256Field, SmokeTest};

const DOCKER_JANITOR_NAME: &str = "docker-janitor-cli";
const DOCKER_JANITOR_DESC: &str =
    "🧼 Clean up dangling Docker resources with preview, stats, and markdown logs";
const DOCKER_JANITOR_HOMEPAGE: &str = "https://github.com/raymonepping/docker-janitor-cli";
const DOCKER_JANITOR_RELEASES: &str =
    "https://github.com/raymonepping/homebrew-docker-janitor-cli/archive/refs/tags";
// The 1.0.0 release was published without a real digest.
const DOCKER_JANITOR_PLACEHOLDER_SHA: &str = "REPLACE_WITH_ACTUAL_SHA256";

const DOCKER_JANITOR_CAVEATS: &str = "\
🧽 Get started with:
  docker_janitor --help

🔍 Features:
  • --dryrun (default): Show what would be removed
  • --force: Actually remove images, containers, volumes, etc.
  • --scope: 'safe' or 'deep' cleanup levels
  • --stats: Show disk usage delta
  • --dryrun-summary: Export analysis to timestamped Markdown
  • --log FILE: Write live cleanup summary

📁 Logs are saved to ./logs/ by default (created automatically).
📚 Full docs: https://github.com/raymonepping/homebrew-docker-janitor-cli
";

fn docker_janitor(version: Version, script: &str, sha256: &str) -> Formula {
    Formula {
        name: DOCKER_JANITOR_NAME.to_string(),
        url: format!("{DOCKER_JANITOR_RELEASES}/v{version}.tar.gz"),
        version,
        desc: Some(DOCKER_JANITOR_DESC.to_string()),
        homepage: Some(DOCKER_JANITOR_HOMEPAGE.to_string()),
        sha256: Sha256Field::parse(sha256),
        mirrors: Vec::new(),
        license: Some("MIT".to_string()),
        dependencies: vec![
            Dependency::new_runtime("bash"),
            Dependency::new_runtime("jq"),
            Dependency::new_runtime("coreutils"),
        ],
        install: vec![
            InstallStep::bin(script, "docker_janitor"),
            InstallStep::lib("lib/*"),
        ],
        caveats: Some(DOCKER_JANITOR_CAVEATS.to_string()),
        test: Some(SmokeTest::help("docker_janitor")),
    }
}

/// Formulae shipped with tapkit itself. Tap definitions take precedence.
pub fn builtin_formulae() -> Vec<Formula> {
    vec![
        docker_janitor(
            Version::new(1, 0, 0),
            "bin/docker_janitor.sh",
            DOCKER_JANITOR_PLACEHOLDER_SHA,
        ),
        // No published digest is bundled for 1.0.1; a tap definition supplies it.
        docker_janitor(
            Version::new(1, 0, 1),
            "bin/docker_janitor",
            DOCKER_JANITOR_PLACEHOLDER_SHA,
        ),
    ]
}

/// Splits `name@version` into its parts.
pub fn parse_formula_spec(spec: &str) -> Result<(&str, Option<Version>)> {
    match spec.split_once('@') {
        Some((name, version)) => Ok((name, Some(parse_version(version)?))),
        None => Ok((spec, None)),
    }
}

pub struct Formulary {
    config: Config,
}

impl Formulary {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// All known definitions of `name`, keyed by version. Tap files override built-ins.
    pub fn versions_of(&self, name: &str) -> Result<BTreeMap<Version, Formula>> {
        let mut found: BTreeMap<Version, Formula> = builtin_formulae()
            .into_iter()
            .filter(|f| f.name == name)
            .map(|f| (f.version.clone(), f))
            .collect();

        for formula_dir in self.config.tap_formula_dirs() {
            let json_path = formula_dir.join(format!("{name}.json"));
            if !json_path.is_file() {
                continue;
            }
            let formula = Formula::load_from_path(&json_path)?;
            if formula.name != name {
                return Err(TapkitError::ParseError(
                    "formula",
                    format!(
                        "{} defines '{}', expected '{name}'",
                        json_path.display(),
                        formula.name
                    ),
                ));
            }
            debug!(
                "Tap definition {} provides {} {}",
                json_path.display(),
                name,
                formula.version
            );
            found.insert(formula.version.clone(), formula);
        }
        Ok(found)
    }

    /// Loads `name` or `name@version`; without a version the newest wins.
    ///
    /// `user/repo/name[@version]` reads the definition from that tap only.
    pub fn load_formula(&self, spec: &str) -> Result<Formula> {
        let (name, version) = parse_formula_spec(spec)?;
        if let Some((tap, name)) = name.rsplit_once('/') {
            return self.load_from_tap(tap, name, version.as_ref(), spec);
        }
        let mut versions = self.versions_of(name)?;

        let selected = match version {
            Some(v) => versions.remove(&v),
            None => versions.pop_last().map(|(_, f)| f),
        };

        match selected {
            Some(formula) => {
                debug!(
                    "Loaded formula '{}' version {}",
                    formula.name,
                    formula.version_str_full()
                );
                Ok(formula)
            }
            None => Err(TapkitError::NotFound(format!("No formula found for '{spec}'"))),
        }
    }

    fn load_from_tap(
        &self,
        tap: &str,
        name: &str,
        version: Option<&Version>,
        spec: &str,
    ) -> Result<Formula> {
        let path = self
            .config
            .get_formula_path_from_tap(tap, name)
            .ok_or_else(|| TapkitError::NotFound(format!("No formula found for '{spec}'")))?;
        let formula = Formula::load_from_path(&path)?;
        if formula.name != name || version.is_some_and(|v| *v != formula.version) {
            return Err(TapkitError::NotFound(format!(
                "{} provides {} {}, not '{spec}'",
                path.display(),
                formula.name,
                formula.version
            )));
        }
        Ok(formula)
    }
}
