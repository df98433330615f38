// scf-core/src/staging.rs
use std::fs;
use std::path::{Path, PathBuf};

use scf_common::config::Config;
use scf_common::error::{Result, ScfError};
use tempfile::TempDir;
use tracing::debug;

/// Scratch space for one install run. Removed when dropped, whichever way the
/// run ends.
#[derive(Debug)]
pub struct Staging {
    dir: TempDir,
}

impl Staging {
    pub fn create(config: &Config, formula_name: &str) -> Result<Self> {
        let tmp_root = config.tmp_dir();
        fs::create_dir_all(&tmp_root).map_err(|e| {
            ScfError::InstallError(format!(
                "Failed to create temp root {}: {}",
                tmp_root.display(),
                e
            ))
        })?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("scf-{formula_name}-"))
            .tempdir_in(&tmp_root)?;
        debug!("Created staging directory {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn download_dir(&self) -> PathBuf {
        self.dir.path().join("download")
    }

    pub fn source_dir(&self) -> PathBuf {
        self.dir.path().join("src")
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.dir.path().join("scratch")
    }

    /// Disarms cleanup and returns the directory path.
    pub fn keep(self) -> PathBuf {
        let path = self.dir.keep();
        debug!("Keeping staging directory {}", path.display());
        path
    }
}
