// scf-common/src/error.rs
use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ScfError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("HTTP Request Error: {0}")]
    Http(#[from] Arc<reqwest::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Semantic Versioning Error: {0}")]
    SemVer(#[from] Arc<semver::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Resource Not Found: {0}")]
    NotFound(String),

    #[error("Validation Error: {0}")]
    ValidationError(String),

    #[error("Failed to download '{name}' from '{url}': {reason}")]
    FetchError {
        name: String,
        url: String,
        reason: String,
    },

    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Extraction Error: {0}")]
    ExtractError(String),

    #[error("Required build toolchain '{dependency}' not found: {reason}")]
    MissingToolchain { dependency: String, reason: String },

    #[error("Build failed with {}: {output}", display_exit_code(.exit_code))]
    BuildFailure {
        exit_code: Option<i32>,
        output: String,
    },

    #[error("Failed to execute command: {0}")]
    CommandExecError(String),

    #[error("Install verification failed: {0}")]
    VerificationFailed(String),

    #[error("Installation Error: {0}")]
    InstallError(String),

    #[error("Invalid state transition: {0}")]
    StateError(String),
}

fn display_exit_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "no exit code (terminated by signal or timeout)".to_string(),
    }
}

impl ScfError {
    /// Short category name surfaced to the user alongside the message.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "Io",
            Self::Http(_) | Self::FetchError { .. } => "FetchError",
            Self::Json(_) => "Json",
            Self::SemVer(_) => "SemVer",
            Self::Config(_) => "Config",
            Self::NotFound(_) => "NotFound",
            Self::ValidationError(_) => "Validation",
            Self::ChecksumMismatch { .. } => "ChecksumMismatch",
            Self::ExtractError(_) => "Extract",
            Self::MissingToolchain { .. } => "MissingToolchain",
            Self::BuildFailure { .. } => "BuildFailure",
            Self::CommandExecError(_) => "CommandExec",
            Self::VerificationFailed(_) => "VerificationFailed",
            Self::InstallError(_) => "Install",
            Self::StateError(_) => "State",
        }
    }

    /// Process exit code for the CLI. Only pass/fail is contractual; the
    /// pipeline categories get distinct codes so callers can tell them apart.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Http(_) | Self::FetchError { .. } => 2,
            Self::ChecksumMismatch { .. } => 3,
            Self::MissingToolchain { .. } => 4,
            Self::BuildFailure { .. } => 5,
            Self::VerificationFailed(_) => 6,
            _ => 1,
        }
    }
}

impl From<std::io::Error> for ScfError {
    fn from(err: std::io::Error) -> Self {
        ScfError::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for ScfError {
    fn from(err: reqwest::Error) -> Self {
        ScfError::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for ScfError {
    fn from(err: serde_json::Error) -> Self {
        ScfError::Json(Arc::new(err))
    }
}

impl From<semver::Error> for ScfError {
    fn from(err: semver::Error) -> Self {
        ScfError::SemVer(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, ScfError>;
