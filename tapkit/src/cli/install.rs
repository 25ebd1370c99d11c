// tapkit/src/cli/install.rs
use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use tapkit_common::config::Config;
use tapkit_common::error::{Result, TapkitError};
use tapkit_common::formulary::Formulary;
use tapkit_core::{install_formula, InstallOptions, InstallOutcome};
use tapkit_net::fetch_formula_source;
use tracing::{debug, info};

use crate::cli::ohai;

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Formula to install, optionally pinned as `name@version`
    pub formula: String,

    /// Install from a local source archive instead of downloading it
    #[arg(long, value_name = "PATH")]
    pub archive: Option<PathBuf>,

    /// Install even if runtime dependencies are missing
    #[arg(long)]
    pub ignore_dependencies: bool,

    /// Run the formula's smoke test after installing
    #[arg(long)]
    pub test: bool,
}

impl InstallArgs {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let formula = Formulary::new(config.clone()).load_formula(&self.formula)?;
        ohai(&format!("Installing {} {}", formula.name, formula.version));

        let archive = match &self.archive {
            Some(path) => {
                debug!("Using local archive {}", path.display());
                path.clone()
            }
            None => fetch_formula_source(&formula, config).await?,
        };

        let options = InstallOptions {
            ignore_dependencies: self.ignore_dependencies,
        };
        let outcome: InstallOutcome = {
            let formula = formula.clone();
            let config = config.clone();
            tokio::task::spawn_blocking(move || {
                install_formula(&formula, &archive, &config, &options)
            })
            .await
            .map_err(|e| TapkitError::Generic(format!("Install task failed: {e}")))??
        };

        let missing = outcome.dependencies.missing();
        if !missing.is_empty() {
            println!(
                "{} missing dependencies: {}",
                "Warning:".yellow().bold(),
                missing.join(", ")
            );
        }

        let missing_optional = outcome.dependencies.missing_optional();
        if !missing_optional.is_empty() {
            println!(
                "{} optional dependencies not found: {}",
                "Note:".cyan().bold(),
                missing_optional.join(", ")
            );
        }

        if let Some(caveats) = formula.caveats() {
            ohai("Caveats");
            println!("{}", caveats.trim_end());
        }

        if self.test {
            ohai(&format!("Testing {}", formula.name));
            tapkit_core::run_smoke_test(&formula, &outcome.keg_path)?;
            println!("{} smoke test passed", "✓".green());
        }

        info!("Installed {} {}", formula.name, formula.version);
        let files = outcome.receipt.artifacts.len() - outcome.receipt.links().count();
        println!("🍺  {} ({} files)", outcome.keg_path.display(), files);
        Ok(())
    }
}
