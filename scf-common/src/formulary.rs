// scf-common/src/formulary.rs
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::error::{Result, ScfError};
use super::model::formula::{BuildDependency, Formula, FormulaTest};

pub const SPACECLEANER: &str = "spacecleaner";

pub const SPACECLEANER_CAVEATS: &str = "\
🧹 SpaceCleaner is ready to use!

Quick Start:
  spacecleaner              # Interactive mode
  spacecleaner scan         # Check storage usage
  spacecleaner quick        # Quick safe cleanup
  spacecleaner --dry-run    # Preview mode

🛡️  Always run with --dry-run first to preview changes!
";

/// The upstream release checksum has not been published yet. Until it is,
/// installs need `--sha256` or a formula file carrying the real digest.
const SPACECLEANER_SHA256: &str = "";

pub fn spacecleaner() -> Formula {
    Formula::new(
        SPACECLEANER,
        "https://github.com/andrapra-work/spacecleaner/archive/v0.1.0.tar.gz",
        SPACECLEANER_SHA256,
    )
    .with_desc("Fast storage cleanup tool for macOS and Linux")
    .with_homepage("https://github.com/andrapra-work/spacecleaner")
    .with_license("MIT")
    .with_build_dependency(BuildDependency::build("rust"))
    .with_caveats(SPACECLEANER_CAVEATS)
    .with_test(FormulaTest {
        binary: None,
        args: vec!["--version".to_string()],
        expect: SPACECLEANER.to_string(),
    })
}

/// Name → formula lookup over the built-in definitions, optionally extended
/// with one loaded from a JSON file.
#[derive(Debug, Clone)]
pub struct Formulary {
    formulas: HashMap<String, Arc<Formula>>,
}

impl Formulary {
    pub fn builtin() -> Self {
        let mut formulas = HashMap::new();
        let formula = spacecleaner();
        formulas.insert(formula.name().to_string(), Arc::new(formula));
        Self { formulas }
    }

    /// Adds (or replaces) the definition stored in `path`.
    pub fn with_file(mut self, path: &Path) -> Result<Self> {
        debug!("Loading formula definition from {}", path.display());
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ScfError::Config(format!(
                "Failed to read formula file {}: {e}",
                path.display()
            ))
        })?;
        let formula: Formula = serde_json::from_str(&raw)?;
        debug!("Loaded formula '{}' from file.", formula.name());
        self.formulas
            .insert(formula.name().to_string(), Arc::new(formula));
        Ok(self)
    }

    pub fn load_formula(&self, name: &str) -> Result<Arc<Formula>> {
        self.formulas
            .get(name)
            .cloned()
            .ok_or_else(|| ScfError::NotFound(format!("No formula named '{name}'")))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.formulas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
