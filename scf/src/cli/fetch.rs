// scf/src/cli/fetch.rs

use clap::Args;
use colored::Colorize;
use scf_common::config::Config;
use scf_common::error::Result;
use scf_core::{CargoBuild, Installer};
use tokio::sync::broadcast;
use tracing::{debug, instrument};

use super::FormulaArgs;
use crate::ui;

#[derive(Debug, Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub formula: FormulaArgs,

    /// Expected sha256 of the source archive, overriding the formula's
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<String>,
}

impl FetchArgs {
    #[instrument(skip(self, config), fields(formula = %self.formula.name))]
    pub async fn run(&self, config: &Config) -> Result<()> {
        let formula = self.formula.load()?;

        let (event_tx, event_rx) = broadcast::channel(ui::EVENT_CHANNEL_SIZE);
        let printer = tokio::spawn(ui::print_events(event_rx));

        let mut installer = Installer::new(config, CargoBuild::new(config)).with_events(event_tx);
        let result = installer
            .fetch_only(&formula, self.sha256.as_deref(), &config.cache_dir())
            .await;
        drop(installer);
        if let Err(e) = printer.await {
            debug!("Event printer ended abnormally: {}", e);
        }

        let archive = result?;
        println!(
            "{} {} ({} bytes, sha256 {})",
            "==>".bold().blue(),
            archive.path.display().to_string().bold(),
            archive.size_bytes,
            archive.sha256
        );
        Ok(())
    }
}
