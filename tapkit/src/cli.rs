// tapkit/src/cli.rs
//! Defines the command-line argument structure using clap.
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use tapkit_common::error::Result;
use tapkit_common::Config;

pub mod caveats;
pub mod fetch;
pub mod info;
pub mod install;
pub mod list;
pub mod test;
pub mod uninstall;

use crate::cli::caveats::Caveats;
use crate::cli::fetch::Fetch;
use crate::cli::info::Info;
use crate::cli::install::InstallArgs;
use crate::cli::list::List;
use crate::cli::test::TestArgs;
use crate::cli::uninstall::Uninstall;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "tapkit", bin_name = "tapkit")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch, verify and install a formula
    Install(InstallArgs),
    /// Run an installed formula's smoke test
    Test(TestArgs),
    /// Show a formula's post-install notes
    Caveats(Caveats),
    /// Show a formula's definition and install state
    Info(Info),
    /// Download and verify a formula's source archive into the cache
    Fetch(Fetch),
    /// Remove an installed formula
    Uninstall(Uninstall),
    /// List installed formulae
    List(List),
}

impl Command {
    pub async fn run(&self, config: &Config) -> Result<()> {
        match self {
            Self::Install(command) => command.run(config).await,
            Self::Test(command) => command.run(config),
            Self::Caveats(command) => command.run(config),
            Self::Info(command) => command.run(config),
            Self::Fetch(command) => command.run(config).await,
            Self::Uninstall(command) => command.run(config),
            Self::List(command) => command.run(config),
        }
    }
}

/// `==> message` section header.
pub(crate) fn ohai(message: &str) {
    println!("{}{}", "==> ".bold().blue(), message.bold());
}
