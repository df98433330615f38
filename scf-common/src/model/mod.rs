// scf-common/src/model/mod.rs
pub mod checksum;
pub mod formula;
pub mod receipt;

pub use checksum::Checksum;
pub use formula::{ArchiveKind, BuildDependency, DependencyTag, Formula, FormulaTest};
pub use receipt::InstallReceipt;
