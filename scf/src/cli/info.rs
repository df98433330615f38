// scf/src/cli/info.rs
//! Contains the logic for the `info` command.

use clap::Args;
use colored::Colorize;
use scf_common::config::Config;
use scf_common::error::Result;
use scf_common::model::{DependencyTag, Formula, InstallReceipt};
use scf_core::keg::installed_keg;

use super::FormulaArgs;

#[derive(Args, Debug)]
pub struct Info {
    #[command(flatten)]
    pub formula: FormulaArgs,

    /// Print the formula definition as JSON
    #[arg(long)]
    pub json: bool,
}

impl Info {
    pub fn run(&self, config: &Config) -> Result<()> {
        let formula = self.formula.load()?;
        tracing::debug!("Showing info for formula: {}", formula.name());
        if self.json {
            println!("{}", serde_json::to_string_pretty(formula.as_ref())?);
            return Ok(());
        }
        print_formula_info(&formula)?;
        print_install_status(config, &formula);
        Ok(())
    }
}

fn print_formula_info(formula: &Formula) -> Result<()> {
    println!("{}", format!("Formula: {}", formula.name()).green().bold());
    println!("  {:<10} {}", "Version", formula.version_str()?);
    println!("  {:<10} {}", "License", or_na(formula.license()));
    println!("  {:<10} {}", "Homepage", or_na(formula.homepage()));
    println!("  {:<10} {}", "Source", formula.url());
    let sha256 = if formula.sha256().is_empty() {
        "not published (pass --sha256)".yellow().to_string()
    } else {
        formula.sha256().to_string()
    };
    println!("  {:<10} {}", "sha256", sha256);

    if !formula.desc().is_empty() {
        println!("\n{}", "Description".blue().bold());
        println!("  {}", formula.desc());
    }

    let build_deps: Vec<&str> = formula
        .build_dependencies()
        .iter()
        .filter(|d| d.tag == DependencyTag::Build)
        .map(|d| d.name.as_str())
        .collect();
    if !build_deps.is_empty() {
        println!("\n{}", "Build dependencies".blue().bold());
        println!("  {}", build_deps.join(", "));
    }
    Ok(())
}

fn print_install_status(config: &Config, formula: &Formula) {
    println!("\n{}", "Installed".blue().bold());
    let receipt = installed_keg(config, formula)
        .and_then(|keg| InstallReceipt::read_from_keg(&keg).map(|r| (keg, r)));
    match receipt {
        Ok((keg, receipt)) => {
            println!("  {} ({})", keg.display(), receipt.installed_at);
            println!("  built with {} {}", receipt.build_system, receipt.build_args.join(" "));
        }
        Err(e) => {
            tracing::debug!("No install found: {}", e);
            println!("  Not installed");
        }
    }
}

fn or_na(value: &str) -> &str {
    if value.is_empty() {
        "N/A"
    } else {
        value
    }
}
