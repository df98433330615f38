// scf/src/cli.rs
//! Defines the command-line argument structure using clap.
use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgAction, Args, Parser, Subcommand};
use scf_common::error::{Result, ScfError};
use scf_common::formulary::{Formulary, SPACECLEANER};
use scf_common::{Config, Formula};

pub mod caveats;
pub mod fetch;
pub mod info;
pub mod install;

use crate::cli::caveats::Caveats;
use crate::cli::fetch::FetchArgs;
use crate::cli::info::Info;
use crate::cli::install::InstallArgs;
use crate::cli::test::TestArgs;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "scf", bin_name = "scf")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch, verify, build and link a formula
    Install(InstallArgs),
    /// Download and verify the source archive only
    Fetch(FetchArgs),
    /// Run the formula test against the installed keg
    Test(TestArgs),
    /// Show the formula definition
    Info(Info),
    /// Print the post-install notes
    Caveats(Caveats),
}

impl Command {
    pub async fn run(&self, config: &Config) -> Result<()> {
        match self {
            Self::Install(command) => command.run(config).await,
            Self::Fetch(command) => command.run(config).await,
            Self::Test(command) => command.run(config).await,
            Self::Info(command) => command.run(config),
            Self::Caveats(command) => command.run(),
        }
    }
}

/// Formula selection shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct FormulaArgs {
    /// Formula name
    #[arg(default_value = SPACECLEANER)]
    pub name: String,

    /// Load the formula definition from a JSON file
    #[arg(long, value_name = "FILE")]
    pub formula_file: Option<PathBuf>,
}

impl FormulaArgs {
    pub fn load(&self) -> Result<Arc<Formula>> {
        let mut formulary = Formulary::builtin();
        if let Some(path) = &self.formula_file {
            formulary = formulary.with_file(path)?;
        }
        formulary.load_formula(&self.name).map_err(|e| match e {
            ScfError::NotFound(msg) => ScfError::NotFound(format!(
                "{msg} (known formulas: {})",
                formulary.names().join(", ")
            )),
            other => other,
        })
    }
}
