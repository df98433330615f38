// scf-core/src/build/toolchain.rs
use std::path::{Path, PathBuf};

use scf_common::error::{Result, ScfError};
use scf_common::model::{DependencyTag, Formula};
use tracing::debug;

/// Finds `executable` on PATH, or uses `explicit` when given.
pub fn find_executable(
    dependency: &str,
    executable: &str,
    explicit: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return if path.is_file() {
            debug!("Using explicit {} at {}", executable, path.display());
            Ok(path.to_path_buf())
        } else {
            Err(ScfError::MissingToolchain {
                dependency: dependency.to_string(),
                reason: format!("{} does not exist or is not a file", path.display()),
            })
        };
    }

    debug!("Searching PATH for '{executable}'");
    which::which(executable).map_err(|e| ScfError::MissingToolchain {
        dependency: dependency.to_string(),
        reason: format!("'{executable}' not found on PATH: {e}"),
    })
}

/// Checks every build-time dependency of `formula` except `skip`, which the
/// caller resolves itself.
pub fn check_build_dependencies(formula: &Formula, skip: &str) -> Result<()> {
    for dependency in formula
        .build_dependencies()
        .iter()
        .filter(|d| d.tag == DependencyTag::Build && d.name != skip)
    {
        for executable in dependency.executables() {
            let path = find_executable(&dependency.name, executable, None)?;
            debug!(
                "Build dependency '{}' satisfied by {}",
                dependency.name,
                path.display()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use scf_common::model::BuildDependency;

    use super::*;

    #[test]
    fn explicit_path_must_exist() {
        let err = find_executable("rust", "cargo", Some(Path::new("/nonexistent/cargo")))
            .unwrap_err();
        match err {
            ScfError::MissingToolchain { dependency, .. } => assert_eq!(dependency, "rust"),
            other => panic!("expected MissingToolchain, got {other:?}"),
        }
    }

    #[test]
    fn unknown_build_dependency_is_missing() {
        let formula = Formula::new("tool", "https://example.com/tool-1.0.tar.gz", "")
            .with_build_dependency(BuildDependency::build("scf-no-such-toolchain-xyz"));
        assert!(matches!(
            check_build_dependencies(&formula, "rust"),
            Err(ScfError::MissingToolchain { .. })
        ));
    }

    #[test]
    fn skipped_dependency_is_not_checked() {
        let formula = Formula::new("tool", "https://example.com/tool-1.0.tar.gz", "")
            .with_build_dependency(BuildDependency::build("scf-no-such-toolchain-xyz"));
        assert!(check_build_dependencies(&formula, "scf-no-such-toolchain-xyz").is_ok());
    }
}
