// scf-core/src/locate.rs
use scf_common::error::{Result, ScfError};
use scf_common::model::{ArchiveKind, Checksum, Formula};
use tracing::debug;

/// Where a formula's source comes from and what it must hash to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub name: String,
    pub version: String,
    pub url: String,
    pub checksum: Checksum,
    pub file_name: String,
    pub kind: ArchiveKind,
}

/// Resolves the archive URL and expected checksum for `formula`.
/// `sha256_override` replaces the formula's own checksum.
pub fn locate(formula: &Formula, sha256_override: Option<&str>) -> Result<SourceLocation> {
    let raw_checksum = sha256_override.unwrap_or(formula.sha256());
    if raw_checksum.trim().is_empty() {
        return Err(ScfError::ValidationError(format!(
            "Formula '{}' has no release checksum; pass --sha256 with the digest of {}",
            formula.name(),
            formula.url()
        )));
    }
    let checksum = Checksum::parse(raw_checksum)?;

    let file_name = formula.archive_file_name()?;
    let kind = ArchiveKind::from_file_name(&file_name).ok_or_else(|| {
        ScfError::ValidationError(format!(
            "Unsupported archive type for '{file_name}' (expected a tarball)"
        ))
    })?;
    let version = formula.version_str()?;

    debug!(
        "Located {} {} at {} (sha256 {})",
        formula.name(),
        version,
        formula.url(),
        checksum
    );
    Ok(SourceLocation {
        name: formula.name().to_string(),
        version,
        url: formula.url().to_string(),
        checksum,
        file_name,
        kind,
    })
}
