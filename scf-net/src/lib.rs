// scf-net/src/lib.rs
pub mod http;
pub mod validation;

pub use http::{fetch_archive, FetchedArchive};
pub use validation::{sha256_file, validate_url, verify_checksum};
