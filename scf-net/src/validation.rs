// scf-net/src/validation.rs
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use scf_common::error::{Result, ScfError};
use scf_common::model::Checksum;
use sha2::{Digest, Sha256};
use url::Url;

/// SHA-256 of the file at `path`, lowercase hex.
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let bytes_copied = io::copy(&mut reader, &mut hasher)?;
    let actual = hex::encode(hasher.finalize());
    tracing::debug!(
        "Calculated SHA256: {} ({} bytes read)",
        actual,
        bytes_copied
    );
    Ok(actual)
}

/// Verifies `path` against `expected`, returning the computed digest.
pub fn verify_checksum(path: &Path, expected: &Checksum) -> Result<String> {
    tracing::debug!("Verifying checksum for: {}", path.display());
    let actual = sha256_file(path)?;
    tracing::debug!("Expected SHA256:   {}", expected);
    if expected.matches(&actual) {
        Ok(actual)
    } else {
        Err(ScfError::ChecksumMismatch {
            path: path.display().to_string(),
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Validates a source URL. `https` is always accepted; `http` only when
/// `allow_http` is set.
pub fn validate_url(url_str: &str, allow_http: bool) -> Result<Url> {
    let url = Url::parse(url_str).map_err(|e| {
        ScfError::ValidationError(format!("Failed to parse URL '{url_str}': {e}"))
    })?;
    match url.scheme() {
        "https" => Ok(url),
        "http" if allow_http => {
            tracing::warn!("Fetching over plain http: {}", url_str);
            Ok(url)
        }
        other => Err(ScfError::ValidationError(format!(
            "Invalid URL scheme for '{url_str}': Must be https, but got '{other}'"
        ))),
    }
}
