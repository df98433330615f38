// scf/src/cli/caveats.rs

use std::io;

use clap::Args;
use scf_common::error::Result;
use scf_core::report::write_caveats;

use super::FormulaArgs;

#[derive(Debug, Args)]
pub struct Caveats {
    #[command(flatten)]
    pub formula: FormulaArgs,
}

impl Caveats {
    pub fn run(&self) -> Result<()> {
        let formula = self.formula.load()?;
        let mut stdout = io::stdout().lock();
        if !write_caveats(&formula, &mut stdout)? {
            tracing::debug!("Formula '{}' has no caveats", formula.name());
        }
        Ok(())
    }
}
