// scf-core/src/build/mod.rs
use std::path::{Path, PathBuf};

use scf_common::error::Result;
use scf_common::model::Formula;

use crate::process::CommandOutput;

pub mod cargo;
pub mod toolchain;

pub use cargo::CargoBuild;

/// Paths handed to a build system for one install.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Unpacked, verified source tree.
    pub source_dir: PathBuf,
    /// Install destination (the keg).
    pub keg_path: PathBuf,
    /// Scratch space for intermediate artifacts; lives in the staging dir.
    pub scratch_dir: PathBuf,
}

/// An external build toolchain the installer delegates to.
#[allow(async_fn_in_trait)]
pub trait BuildSystem {
    fn name(&self) -> &str;

    /// Resolves the toolchain executable and the formula's other build
    /// dependencies. Must not spawn any process.
    fn locate_toolchain(&self, formula: &Formula) -> Result<PathBuf>;

    /// The argument list passed to the toolchain for `request`.
    fn install_args(&self, request: &BuildRequest) -> Vec<String>;

    /// Runs the build. A non-zero exit is reported as `BuildFailure`.
    async fn build(&self, toolchain: &Path, request: &BuildRequest) -> Result<CommandOutput>;
}
