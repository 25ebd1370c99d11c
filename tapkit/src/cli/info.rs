// tapkit/src/cli/info.rs
use clap::Args;
use colored::Colorize;
use tapkit_common::config::Config;
use tapkit_common::error::Result;
use tapkit_common::formulary::Formulary;
use tapkit_common::keg::KegRegistry;
use tapkit_common::model::InstallStep;
use tapkit_core::check::{check_dependencies, DependencyStatus};

use crate::cli::ohai;

#[derive(Args, Debug)]
pub struct Info {
    /// Formula to describe, optionally as `name@version`
    pub formula: String,

    /// Print the formula definition as JSON
    #[arg(long)]
    pub json: bool,
}

impl Info {
    pub fn run(&self, config: &Config) -> Result<()> {
        let formulary = Formulary::new(config.clone());
        let formula = formulary.load_formula(&self.formula)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&formula)?);
            return Ok(());
        }

        println!(
            "{}: {}",
            formula.name.bold().green(),
            formula.version
        );
        if let Some(desc) = &formula.desc {
            println!("{desc}");
        }
        if let Some(homepage) = &formula.homepage {
            println!("{homepage}");
        }
        if let Some(license) = &formula.license {
            println!("License: {license}");
        }

        let versions: Vec<String> = formulary
            .versions_of(&formula.name)?
            .keys()
            .map(|v| v.to_string())
            .collect();
        println!("Known versions: {}", versions.join(", "));

        match KegRegistry::new(config.clone()).get_installed_keg(&formula.name)? {
            Some(keg) => println!("Installed: {} ({})", keg.version_str, keg.path.display()),
            None => println!("Not installed"),
        }

        ohai("Source");
        println!("{}", formula.url);
        for mirror in &formula.mirrors {
            println!("{mirror} (mirror)");
        }
        if formula.sha256.is_placeholder() {
            println!(
                "SHA256: {} {}",
                formula.sha256,
                "(placeholder; downloads will not verify)".yellow()
            );
        } else {
            println!("SHA256: {}", formula.sha256);
        }

        ohai("Dependencies");
        let report = check_dependencies(&formula, config)?;
        if report.entries.is_empty() {
            println!("None");
        }
        for entry in &report.entries {
            let label = if entry.optional {
                format!("{} (optional)", entry.name)
            } else {
                entry.name.clone()
            };
            match &entry.status {
                DependencyStatus::Keg(path) | DependencyStatus::OnPath(path) => {
                    println!("{} {} ({})", "✔".green(), label, path.display())
                }
                DependencyStatus::Missing if entry.optional => {
                    println!("{} {}", "-".yellow(), label)
                }
                DependencyStatus::Missing => println!("{} {}", "✘".red(), label),
            }
        }

        ohai("Installs");
        for step in &formula.install {
            match step {
                InstallStep::Bin { source, .. } => println!(
                    "bin/{} <- {}",
                    step.bin_name().unwrap_or_default(),
                    source.display()
                ),
                InstallStep::Lib { pattern } => println!("lib/ <- {pattern}"),
            }
        }

        if let Some(caveats) = formula.caveats() {
            ohai("Caveats");
            println!("{}", caveats.trim_end());
        }
        Ok(())
    }
}
