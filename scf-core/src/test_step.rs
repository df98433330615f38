// scf-core/src/test_step.rs
use std::path::Path;
use std::time::Duration;

use scf_common::error::{Result, ScfError};
use scf_common::model::{Formula, FormulaTest};
use tracing::debug;

use crate::process::{run_command, CommandSpec};

const TEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Passes when `stdout` contains `expected` as a literal substring.
pub fn check_output(stdout: &str, expected: &str) -> Result<()> {
    if stdout.contains(expected) {
        Ok(())
    } else {
        Err(ScfError::VerificationFailed(format!(
            "expected '{}' in output, got '{}'",
            expected,
            stdout.trim()
        )))
    }
}

/// Runs the formula's smoke test against the binary in `keg_path/bin`.
/// Returns the captured stdout, or `None` when the formula defines no test.
pub async fn run_formula_test(formula: &Formula, keg_path: &Path) -> Result<Option<String>> {
    let Some(test) = formula.test() else {
        debug!("Formula '{}' defines no test", formula.name());
        return Ok(None);
    };
    run_test(formula.name(), test, keg_path).await.map(Some)
}

async fn run_test(name: &str, test: &FormulaTest, keg_path: &Path) -> Result<String> {
    let binary = keg_path.join("bin").join(test.binary.as_deref().unwrap_or(name));
    if !binary.is_file() {
        return Err(ScfError::VerificationFailed(format!(
            "installed binary {} not found",
            binary.display()
        )));
    }

    debug!("Testing {} {:?}", binary.display(), test.args);
    let spec = CommandSpec::new(&binary)
        .args(test.args.iter().cloned())
        .timeout(Some(TEST_TIMEOUT));
    let output = run_command(&spec)
        .await
        .map_err(|e| ScfError::VerificationFailed(format!("{}: {e}", binary.display())))?;
    if !output.success() {
        return Err(ScfError::VerificationFailed(format!(
            "{} {} exited with {:?}: {}",
            binary.display(),
            test.args.join(" "),
            output.exit_code,
            output.combined_tail(10)
        )));
    }
    check_output(&output.stdout, &test.expect)?;
    Ok(output.stdout)
}
