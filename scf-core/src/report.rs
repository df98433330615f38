// scf-core/src/report.rs
use std::io::{self, Write};

use scf_common::model::Formula;

/// Writes the formula's caveats under a `==> Caveats` heading. Nothing is
/// written for formulas without caveats.
pub fn write_caveats<W: Write>(formula: &Formula, out: &mut W) -> io::Result<bool> {
    match formula.caveats() {
        Some(text) => {
            writeln!(out, "==> Caveats")?;
            out.write_all(text.as_bytes())?;
            if !text.ends_with('\n') {
                writeln!(out)?;
            }
            Ok(true)
        }
        None => Ok(false),
    }
}
