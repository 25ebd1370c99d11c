// tapkit/src/cli/uninstall.rs
use clap::Args;
use tapkit_common::config::Config;
use tapkit_common::error::Result;
use tapkit_core::uninstall_formula;

#[derive(Args, Debug)]
pub struct Uninstall {
    /// Formula to remove (all installed versions)
    pub formula: String,
}

impl Uninstall {
    pub fn run(&self, config: &Config) -> Result<()> {
        for report in uninstall_formula(&self.formula, config)? {
            println!(
                "Uninstalling {}... ({} links removed)",
                report.keg_path.display(),
                report.links_removed
            );
        }
        Ok(())
    }
}
