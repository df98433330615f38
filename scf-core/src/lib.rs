// scf-core/src/lib.rs

pub mod build;
pub mod extract;
pub mod installer;
pub mod keg;
pub mod locate;
pub mod process;
pub mod report;
pub mod staging;
pub mod test_step;

// Re-export key types for the CLI crate
pub use build::{BuildRequest, BuildSystem, CargoBuild};
pub use installer::{InstallOptions, InstallOutcome, Installer, VerifiedArchive};
pub use locate::{locate, SourceLocation};
pub use process::CommandOutput;
