// scf-common/src/model/receipt.rs
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const RECEIPT_FILE_NAME: &str = "INSTALL_RECEIPT.json";

/// Written into the keg after a successful build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReceipt {
    pub name: String,
    pub version: String,
    pub source_url: String,
    pub sha256: String,
    pub license: String,
    pub build_system: String,
    pub build_args: Vec<String>,
    /// RFC 3339 timestamp.
    pub installed_at: String,
}

impl InstallReceipt {
    pub fn write_to_keg(&self, keg_path: &Path) -> Result<()> {
        let path = keg_path.join(RECEIPT_FILE_NAME);
        tracing::debug!("Writing install receipt to {}", path.display());
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(())
    }

    pub fn read_from_keg(keg_path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(keg_path.join(RECEIPT_FILE_NAME))?;
        Ok(serde_json::from_str(&raw)?)
    }
}
