// tapkit/src/cli/fetch.rs
use clap::Args;
use tapkit_common::config::Config;
use tapkit_common::error::Result;
use tapkit_common::formulary::Formulary;
use tapkit_net::fetch_formula_source;

use crate::cli::ohai;

#[derive(Args, Debug)]
pub struct Fetch {
    /// Formula whose source archive to download
    pub formula: String,
}

impl Fetch {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let formula = Formulary::new(config.clone()).load_formula(&self.formula)?;
        ohai(&format!("Fetching {} {}", formula.name, formula.version));
        let path = fetch_formula_source(&formula, config).await?;
        println!("Downloaded: {}", path.display());
        println!("SHA256: {}", formula.sha256);
        Ok(())
    }
}
