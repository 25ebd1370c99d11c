// tapkit/src/cli/list.rs
use clap::Args;
use tapkit_common::config::Config;
use tapkit_common::error::Result;
use tapkit_common::keg::KegRegistry;

#[derive(Args, Debug)]
pub struct List {
    /// Print keg paths instead of `name version`
    #[arg(long)]
    pub paths: bool,
}

impl List {
    pub fn run(&self, config: &Config) -> Result<()> {
        let kegs = KegRegistry::new(config.clone()).list_installed_kegs()?;
        if kegs.is_empty() {
            println!("No formulae installed.");
            return Ok(());
        }
        for keg in kegs {
            if self.paths {
                println!("{}", keg.path.display());
            } else {
                println!("{} {}", keg.name, keg.version_str);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_prefix_lists_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_root(tmp.path());
        assert!(List { paths: false }.run(&config).is_ok());
    }
}
