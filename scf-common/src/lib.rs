// scf-common/src/lib.rs
pub mod config;
pub mod error;
pub mod formulary;
pub mod model;
pub mod pipeline;

// Re-export key types
pub use config::Config;
pub use error::{Result, ScfError};
pub use formulary::Formulary;
pub use model::{Checksum, Formula};
