// tapkit-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};

use directories::UserDirs;
use tracing::debug;

use super::error::Result;

// Used when neither TAPKIT_ROOT nor HOMEBREW_PREFIX is set.
const DEFAULT_FALLBACK_TAPKIT_ROOT: &str = "/opt/tapkit";

#[derive(Debug, Clone)]
pub struct Config {
    pub tapkit_root: PathBuf,
    pub github_api_token: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading tapkit configuration");

        let root_str = env::var("TAPKIT_ROOT")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| env::var("HOMEBREW_PREFIX").ok().filter(|s| !s.is_empty()))
            .unwrap_or_else(|| {
                debug!(
                    "TAPKIT_ROOT and HOMEBREW_PREFIX not set or empty, falling back to default: {}",
                    DEFAULT_FALLBACK_TAPKIT_ROOT
                );
                DEFAULT_FALLBACK_TAPKIT_ROOT.to_string()
            });

        let tapkit_root = expand_home(&root_str);
        debug!("Effective TAPKIT_ROOT set to: {}", tapkit_root.display());

        let github_api_token = env::var("TAPKIT_GITHUB_API_TOKEN")
            .ok()
            .filter(|s| !s.is_empty());

        debug!("Configuration loaded successfully.");
        Ok(Self {
            tapkit_root,
            github_api_token,
        })
    }

    /// Builds a configuration rooted at an explicit prefix, ignoring the environment.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            tapkit_root: root.into(),
            github_api_token: None,
        }
    }

    pub fn tapkit_root(&self) -> &Path {
        &self.tapkit_root
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.tapkit_root.join("bin")
    }

    pub fn cellar_dir(&self) -> PathBuf {
        self.tapkit_root.join("Cellar")
    }

    pub fn opt_dir(&self) -> PathBuf {
        self.tapkit_root.join("opt")
    }

    pub fn taps_dir(&self) -> PathBuf {
        self.tapkit_root.join("Library/Taps")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.tapkit_root.join("tapkit_cache")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.tapkit_root.join("tapkit_logs")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.tapkit_root.join("tmp")
    }

    pub fn formula_cellar_dir(&self, formula_name: &str) -> PathBuf {
        self.cellar_dir().join(formula_name)
    }

    pub fn formula_keg_path(&self, formula_name: &str, version_str: &str) -> PathBuf {
        self.formula_cellar_dir(formula_name).join(version_str)
    }

    pub fn formula_opt_path(&self, formula_name: &str) -> PathBuf {
        self.opt_dir().join(formula_name)
    }

    pub fn get_tap_path(&self, name: &str) -> Option<PathBuf> {
        let parts: Vec<&str> = name.split('/').collect();
        if parts.len() == 2 {
            Some(
                self.taps_dir()
                    .join(parts[0])
                    .join(format!("homebrew-{}", parts[1])),
            )
        } else {
            None
        }
    }

    /// Every `Formula` directory under the installed taps, in sorted order.
    pub fn tap_formula_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        let Ok(users) = std::fs::read_dir(self.taps_dir()) else {
            return dirs;
        };
        for user in users.flatten() {
            let Ok(repos) = std::fs::read_dir(user.path()) else {
                continue;
            };
            for repo in repos.flatten() {
                let formula_dir = repo.path().join("Formula");
                if formula_dir.is_dir() {
                    dirs.push(formula_dir);
                }
            }
        }
        dirs.sort();
        dirs
    }

    pub fn get_formula_path_from_tap(&self, tap_name: &str, formula_name: &str) -> Option<PathBuf> {
        self.get_tap_path(tap_name).and_then(|tap_path| {
            let json_path = tap_path
                .join("Formula")
                .join(format!("{formula_name}.json"));
            json_path.exists().then_some(json_path)
        })
    }
}

fn home_dir() -> PathBuf {
    UserDirs::new().map_or_else(|| PathBuf::from("/"), |ud| ud.home_dir().to_path_buf())
}

/// Expands a leading `~/` against the user's home directory.
fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => home_dir().join(rest),
        None if raw == "~" => home_dir(),
        None => PathBuf::from(raw),
    }
}
