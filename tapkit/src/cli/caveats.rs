// tapkit/src/cli/caveats.rs
use clap::Args;
use tapkit_common::config::Config;
use tapkit_common::error::Result;
use tapkit_common::formulary::Formulary;

use crate::cli::ohai;

#[derive(Args, Debug)]
pub struct Caveats {
    /// Formula whose caveats to show
    pub formula: String,
}

impl Caveats {
    pub fn run(&self, config: &Config) -> Result<()> {
        let formula = Formulary::new(config.clone()).load_formula(&self.formula)?;
        match formula.caveats() {
            Some(text) => {
                ohai(&format!("{}: Caveats", formula.name));
                println!("{}", text.trim_end());
            }
            None => println!("{} has no caveats.", formula.name),
        }
        Ok(())
    }
}
