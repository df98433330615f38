// scf-core/src/build/cargo.rs
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use scf_common::config::Config;
use scf_common::error::{Result, ScfError};
use scf_common::model::Formula;
use tracing::{debug, error};

use super::toolchain::{check_build_dependencies, find_executable};
use super::{BuildRequest, BuildSystem};
use crate::process::{run_command, CommandOutput, CommandSpec};

const RUST_DEPENDENCY: &str = "rust";
/// Bookkeeping files `cargo install --root` leaves in the keg.
const CARGO_METADATA_FILES: [&str; 2] = [".crates.toml", ".crates2.json"];
const FAILURE_OUTPUT_LINES: usize = 40;

/// `cargo install` with the standard formula arguments.
#[derive(Debug, Clone, Default)]
pub struct CargoBuild {
    cargo: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl CargoBuild {
    pub fn new(config: &Config) -> Self {
        Self {
            cargo: config.cargo_override.clone(),
            timeout: config.build_timeout,
        }
    }

    pub fn with_cargo(mut self, cargo: impl Into<PathBuf>) -> Self {
        self.cargo = Some(cargo.into());
        self
    }
}

/// `install --locked --root <keg> --path .`
pub fn std_cargo_args(keg_path: &Path) -> Vec<String> {
    vec![
        "install".to_string(),
        "--locked".to_string(),
        "--root".to_string(),
        keg_path.display().to_string(),
        "--path".to_string(),
        ".".to_string(),
    ]
}

impl BuildSystem for CargoBuild {
    fn name(&self) -> &str {
        "cargo"
    }

    fn locate_toolchain(&self, formula: &Formula) -> Result<PathBuf> {
        let cargo = find_executable(RUST_DEPENDENCY, "cargo", self.cargo.as_deref())?;
        check_build_dependencies(formula, RUST_DEPENDENCY)?;
        Ok(cargo)
    }

    fn install_args(&self, request: &BuildRequest) -> Vec<String> {
        std_cargo_args(&request.keg_path)
    }

    async fn build(&self, toolchain: &Path, request: &BuildRequest) -> Result<CommandOutput> {
        debug!("Building with Cargo in {}", request.source_dir.display());
        if !request.source_dir.join("Cargo.toml").is_file() {
            return Err(ScfError::BuildFailure {
                exit_code: None,
                output: format!(
                    "no Cargo.toml in source tree {}",
                    request.source_dir.display()
                ),
            });
        }

        let spec = CommandSpec::new(toolchain)
            .args(self.install_args(request))
            .cwd(&request.source_dir)
            .env(
                "CARGO_TARGET_DIR",
                request.scratch_dir.join("target").display().to_string(),
            )
            .timeout(self.timeout);

        let output = run_command(&spec)
            .await
            .map_err(|e| ScfError::BuildFailure {
                exit_code: None,
                output: e.to_string(),
            })?;
        if !output.success() {
            error!("cargo install failed with exit code {:?}", output.exit_code);
            return Err(ScfError::BuildFailure {
                exit_code: output.exit_code,
                output: output.combined_tail(FAILURE_OUTPUT_LINES),
            });
        }

        for name in CARGO_METADATA_FILES {
            let path = request.keg_path.join(name);
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        debug!("Cargo install completed successfully.");
        Ok(output)
    }
}
