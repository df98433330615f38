// scf-common/src/pipeline.rs
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScfError};

/// Install progress. Strictly linear; `Failed` is terminal and reachable from
/// every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallState {
    Pending,
    Located,
    Fetched,
    Verified,
    Built,
    Reported,
    Failed { at: FailedAt },
}

/// The stage that was running when the pipeline failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailedAt {
    Locate,
    Fetch,
    Verify,
    Build,
    Report,
}

impl InstallState {
    fn successor(self) -> Option<InstallState> {
        match self {
            Self::Pending => Some(Self::Located),
            Self::Located => Some(Self::Fetched),
            Self::Fetched => Some(Self::Verified),
            Self::Verified => Some(Self::Built),
            Self::Built => Some(Self::Reported),
            Self::Reported | Self::Failed { .. } => None,
        }
    }

    /// The stage that runs when leaving this state.
    fn running_stage(self) -> Option<FailedAt> {
        match self {
            Self::Pending => Some(FailedAt::Locate),
            Self::Located => Some(FailedAt::Fetch),
            Self::Fetched => Some(FailedAt::Verify),
            Self::Verified => Some(FailedAt::Build),
            Self::Built => Some(FailedAt::Report),
            Self::Reported | Self::Failed { .. } => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Reported | Self::Failed { .. })
    }

    /// Moves to `next`, which must be the direct successor.
    pub fn advance(self, next: InstallState) -> Result<InstallState> {
        match self.successor() {
            Some(expected) if expected == next => Ok(next),
            _ => Err(ScfError::StateError(format!(
                "cannot move from {self} to {next}"
            ))),
        }
    }

    /// Terminal failure while leaving this state. Terminal states are left
    /// as they are.
    pub fn fail(self) -> InstallState {
        match self.running_stage() {
            Some(at) => Self::Failed { at },
            None => self,
        }
    }
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("Pending"),
            Self::Located => f.write_str("Located"),
            Self::Fetched => f.write_str("Fetched"),
            Self::Verified => f.write_str("Verified"),
            Self::Built => f.write_str("Built"),
            Self::Reported => f.write_str("Reported"),
            Self::Failed { at } => write!(f, "Failed({at:?})"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    Located {
        name: String,
        version: String,
        url: String,
    },
    DownloadStarted {
        url: String,
    },
    DownloadFinished {
        path: PathBuf,
        size_bytes: u64,
    },
    ChecksumVerified {
        sha256: String,
    },
    BuildStarted {
        toolchain: PathBuf,
        args: Vec<String>,
    },
    BuildFinished {
        keg_path: PathBuf,
    },
    Linked {
        links: Vec<PathBuf>,
    },
    Caveats {
        text: String,
    },
    TestPassed {
        output: String,
    },
    StateChanged {
        from: InstallState,
        to: InstallState,
    },
    Failed {
        state: InstallState,
        error: String,
    },
}
