// scf/src/cli/install.rs

use clap::Args;
use colored::Colorize;
use scf_common::config::Config;
use scf_common::error::Result;
use scf_core::{CargoBuild, InstallOptions, Installer};
use tokio::sync::broadcast;
use tracing::{debug, instrument};

use super::FormulaArgs;
use crate::ui;

#[derive(Debug, Args)]
pub struct InstallArgs {
    #[command(flatten)]
    pub formula: FormulaArgs,

    /// Expected sha256 of the source archive, overriding the formula's
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<String>,

    /// Run the formula test after installing
    #[arg(long)]
    pub test: bool,

    /// Keep the staging directory for inspection
    #[arg(long)]
    pub keep_staging: bool,

    /// Do not link executables into the prefix bin directory
    #[arg(long)]
    pub no_link: bool,
}

impl InstallArgs {
    #[instrument(skip(self, config), fields(formula = %self.formula.name))]
    pub async fn run(&self, config: &Config) -> Result<()> {
        let formula = self.formula.load()?;
        let options = InstallOptions {
            sha256_override: self.sha256.clone(),
            run_test: self.test,
            keep_staging: self.keep_staging,
            skip_link: self.no_link,
        };

        let (event_tx, event_rx) = broadcast::channel(ui::EVENT_CHANNEL_SIZE);
        let printer = tokio::spawn(ui::print_events(event_rx));

        let mut installer = Installer::new(config, CargoBuild::new(config)).with_events(event_tx);
        let result = installer.install(&formula, &options).await;
        debug!("Install finished in state {}", installer.state());
        // Closes the event channel so the printer drains and exits.
        drop(installer);
        if let Err(e) = printer.await {
            debug!("Event printer ended abnormally: {}", e);
        }

        let outcome = result?;
        println!(
            "{} {} {} installed to {}",
            "==>".bold().blue(),
            outcome.name.green().bold(),
            outcome.version,
            outcome.keg_path.display()
        );
        if let Some(staging) = &outcome.kept_staging {
            println!("Staging directory kept at {}", staging.display());
        }
        if !outcome.links.is_empty() && !bin_dir_on_path(config) {
            println!(
                "{} {} is not on your PATH",
                "Warning:".yellow(),
                config.bin_dir().display()
            );
        }
        Ok(())
    }
}

fn bin_dir_on_path(config: &Config) -> bool {
    let bin_dir = config.bin_dir();
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|p| p == bin_dir))
        .unwrap_or(false)
}
