// tapkit-common/src/model/formula.rs
// A formula is a declarative recipe: where the source archive lives, how to
// verify it, which files go where, what to tell the user, and how to smoke-test.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use semver::Version;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::dependency::{Dependency, DependencyExt};
use crate::error::{Result, TapkitError};

/// Expected SHA-256 of the source archive.
///
/// Anything that is not 64 hex digits (e.g. `REPLACE_WITH_ACTUAL_SHA256`) is kept
/// as a placeholder, which can never verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sha256Field {
    Hex(String),
    Placeholder(String),
}

impl Sha256Field {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.len() == 64 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            Self::Hex(trimmed.to_ascii_lowercase())
        } else {
            Self::Placeholder(trimmed.to_string())
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }

    /// The digest to verify against, or a checksum error for placeholders.
    pub fn expected(&self) -> Result<&str> {
        match self {
            Self::Hex(hex) => Ok(hex.as_str()),
            Self::Placeholder(raw) => Err(TapkitError::ChecksumError(format!(
                "formula declares placeholder checksum '{raw}' instead of a SHA-256 digest"
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Hex(s) | Self::Placeholder(s) => s,
        }
    }
}

impl fmt::Display for Sha256Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Sha256Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Sha256Field {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// One entry of the install mapping: archive path -> keg path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InstallStep {
    /// Copy a single file into `bin/`, optionally under a new name.
    Bin {
        source: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
    /// Copy every entry matching a glob (relative to the archive root) into `lib/`.
    Lib { pattern: String },
}

impl InstallStep {
    pub fn bin(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self::Bin {
            source: source.into(),
            target: Some(target.into()),
        }
    }

    pub fn lib(pattern: impl Into<String>) -> Self {
        Self::Lib {
            pattern: pattern.into(),
        }
    }

    /// File name the step produces under `bin/`; `None` for lib steps.
    pub fn bin_name(&self) -> Option<String> {
        match self {
            Self::Bin { source, target } => target.clone().or_else(|| {
                source
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            }),
            Self::Lib { .. } => None,
        }
    }
}

/// Post-install acceptance check: run `bin/<command> <args>` and look for `expect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmokeTest {
    pub command: String,
    #[serde(default = "default_test_args")]
    pub args: Vec<String>,
    #[serde(default = "default_test_expect")]
    pub expect: String,
    /// The command is killed and the test fails after this many seconds.
    #[serde(default = "default_test_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_test_args() -> Vec<String> {
    vec!["--help".to_string()]
}

fn default_test_expect() -> String {
    "Usage".to_string()
}

fn default_test_timeout_secs() -> u64 {
    30
}

impl SmokeTest {
    pub fn help(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: default_test_args(),
            expect: default_test_expect(),
            timeout_secs: default_test_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formula {
    pub name: String,
    #[serde(
        serialize_with = "serialize_version",
        deserialize_with = "deserialize_version"
    )]
    pub version: Version,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    /// Source archive URL.
    pub url: String,
    pub sha256: Sha256Field,
    #[serde(default)]
    pub mirrors: Vec<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub install: Vec<InstallStep>,
    #[serde(default)]
    pub caveats: Option<String>,
    #[serde(default)]
    pub test: Option<SmokeTest>,
}

fn serialize_version<S: Serializer>(
    version: &Version,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&version.to_string())
}

fn deserialize_version<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Version, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_version(&raw).map_err(|e| de::Error::custom(format!("Invalid version '{raw}': {e}")))
}

/// Parses a formula version, padding short forms (`1.0` -> `1.0.0`) and
/// tolerating a leading `v` as used by release tags.
pub fn parse_version(raw: &str) -> Result<Version> {
    let trimmed = raw.trim().trim_start_matches('v');
    let padded = match trimmed.split('.').count() {
        1 => format!("{trimmed}.0.0"),
        2 => format!("{trimmed}.0"),
        _ => trimmed.to_string(),
    };
    Ok(Version::parse(&padded)?)
}

impl Formula {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version_str_full(&self) -> String {
        self.version.to_string()
    }

    /// Text shown to the user after a successful install.
    pub fn caveats(&self) -> Option<&str> {
        self.caveats.as_deref()
    }

    pub fn runtime_dependencies(&self) -> Vec<&Dependency> {
        self.dependencies.runtime()
    }

    /// Names of the executables the install mapping puts in `bin/`, in order.
    pub fn bin_names(&self) -> Vec<String> {
        self.install.iter().filter_map(InstallStep::bin_name).collect()
    }

    /// The smoke test, defaulting to `<first bin> --help` expecting `Usage`.
    pub fn smoke_test(&self) -> Option<SmokeTest> {
        self.test
            .clone()
            .or_else(|| self.bin_names().into_iter().next().map(SmokeTest::help))
    }

    /// Cache file name for the source archive, stable per name and version.
    pub fn archive_file_name(&self) -> String {
        let ext = if self.url.ends_with(".tar.gz") {
            "tar.gz"
        } else if self.url.ends_with(".tgz") {
            "tgz"
        } else {
            "download"
        };
        format!("{}-{}.{}", self.name, self.version, ext)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.name.contains('/') || self.name.contains("..") {
            return Err(TapkitError::ValidationError(format!(
                "Invalid formula name '{}'",
                self.name
            )));
        }
        if self.url.is_empty() {
            return Err(TapkitError::ValidationError(format!(
                "Formula '{}' has no source url",
                self.name
            )));
        }
        for step in &self.install {
            let source = match step {
                InstallStep::Bin { source, .. } => source.to_string_lossy().into_owned(),
                InstallStep::Lib { pattern } => pattern.clone(),
            };
            if Path::new(&source).is_absolute() || source.split('/').any(|c| c == "..") {
                return Err(TapkitError::ValidationError(format!(
                    "Install source '{source}' of formula '{}' must stay inside the archive",
                    self.name
                )));
            }
        }
        if let Some(name) = self.bin_names().iter().find(|n| n.contains('/')) {
            return Err(TapkitError::ValidationError(format!(
                "Binary name '{name}' of formula '{}' must not contain '/'",
                self.name
            )));
        }
        Ok(())
    }

    pub fn from_json_str(data: &str) -> Result<Self> {
        let formula: Formula = serde_json::from_str(data)?;
        formula.validate()?;
        Ok(formula)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        debug!("Loading formula definition from {}", path.display());
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data).map_err(|e| {
            TapkitError::ParseError("formula", format!("{}: {e}", path.display()))
        })
    }
}
