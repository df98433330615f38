// scf-common/src/model/formula.rs
//! The formula record: everything needed to fetch, verify, build and test one
//! package from source.

use semver::Version;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, ScfError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyTag {
    /// Needed only while building; not at runtime.
    Build,
    Runtime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDependency {
    pub name: String,
    #[serde(default = "default_dependency_tag")]
    pub tag: DependencyTag,
}

fn default_dependency_tag() -> DependencyTag {
    DependencyTag::Build
}

impl BuildDependency {
    pub fn build(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tag: DependencyTag::Build,
        }
    }

    /// Executables that must be present for this dependency to count as
    /// installed.
    pub fn executables(&self) -> Vec<&str> {
        match self.name.as_str() {
            "rust" => vec!["cargo"],
            other => vec![other],
        }
    }
}

/// Post-install smoke test: run the installed binary and look for `expect` in
/// its stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaTest {
    #[serde(default)]
    pub binary: Option<String>,
    pub args: Vec<String>,
    pub expect: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveKind {
    TarGz,
    TarBz2,
    TarXz,
    Tar,
}

impl ArchiveKind {
    const SUFFIXES: [(&'static str, ArchiveKind); 7] = [
        (".tar.gz", ArchiveKind::TarGz),
        (".tgz", ArchiveKind::TarGz),
        (".tar.bz2", ArchiveKind::TarBz2),
        (".tbz2", ArchiveKind::TarBz2),
        (".tar.xz", ArchiveKind::TarXz),
        (".txz", ArchiveKind::TarXz),
        (".tar", ArchiveKind::Tar),
    ];

    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let lower = file_name.to_ascii_lowercase();
        Self::SUFFIXES
            .iter()
            .find(|(suffix, _)| lower.ends_with(suffix))
            .map(|(_, kind)| *kind)
    }

    /// Strips the archive suffix from `file_name`, if it carries one.
    pub fn strip_suffix(file_name: &str) -> &str {
        let lower = file_name.to_ascii_lowercase();
        for (suffix, _) in Self::SUFFIXES.iter() {
            if lower.ends_with(suffix) {
                return &file_name[..file_name.len() - suffix.len()];
            }
        }
        file_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formula {
    name: String,
    desc: String,
    homepage: String,
    url: String,
    sha256: String,
    license: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    build_dependencies: Vec<BuildDependency>,
    #[serde(default)]
    caveats: Option<String>,
    #[serde(default)]
    test: Option<FormulaTest>,
}

impl Formula {
    pub fn new(name: &str, url: &str, sha256: &str) -> Self {
        Self {
            name: name.to_string(),
            desc: String::new(),
            homepage: String::new(),
            url: url.to_string(),
            sha256: sha256.to_string(),
            license: String::new(),
            version: None,
            build_dependencies: Vec::new(),
            caveats: None,
            test: None,
        }
    }

    pub fn with_desc(mut self, desc: &str) -> Self {
        self.desc = desc.to_string();
        self
    }

    pub fn with_homepage(mut self, homepage: &str) -> Self {
        self.homepage = homepage.to_string();
        self
    }

    pub fn with_license(mut self, license: &str) -> Self {
        self.license = license.to_string();
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn with_sha256(mut self, sha256: &str) -> Self {
        self.sha256 = sha256.to_string();
        self
    }

    pub fn with_build_dependency(mut self, dependency: BuildDependency) -> Self {
        self.build_dependencies.push(dependency);
        self
    }

    pub fn with_caveats(mut self, caveats: &str) -> Self {
        self.caveats = Some(caveats.to_string());
        self
    }

    pub fn with_test(mut self, test: FormulaTest) -> Self {
        self.test = Some(test);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn homepage(&self) -> &str {
        &self.homepage
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn license(&self) -> &str {
        &self.license
    }

    pub fn build_dependencies(&self) -> &[BuildDependency] {
        &self.build_dependencies
    }

    pub fn caveats(&self) -> Option<&str> {
        self.caveats.as_deref()
    }

    pub fn test(&self) -> Option<&FormulaTest> {
        self.test.as_ref()
    }

    /// Last path segment of the source URL.
    pub fn archive_file_name(&self) -> Result<String> {
        let parsed = Url::parse(&self.url).map_err(|e| {
            ScfError::ValidationError(format!("Invalid source URL '{}': {e}", self.url))
        })?;
        parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                ScfError::ValidationError(format!(
                    "Source URL '{}' has no file name component",
                    self.url
                ))
            })
    }

    /// The explicit version, or the one embedded in the archive name
    /// (`v0.1.0.tar.gz`, `spacecleaner-0.1.0.tar.gz`).
    pub fn version(&self) -> Result<Version> {
        let raw = match &self.version {
            Some(v) => v.clone(),
            None => {
                let file_name = self.archive_file_name()?;
                let stem = ArchiveKind::strip_suffix(&file_name);
                let stem = stem
                    .strip_prefix(&format!("{}-", self.name))
                    .unwrap_or(stem);
                stem.strip_prefix('v').unwrap_or(stem).to_string()
            }
        };
        parse_lenient_version(&raw)
    }

    pub fn version_str(&self) -> Result<String> {
        Ok(self.version()?.to_string())
    }
}

/// Semver parse that pads `1` and `1.2` out to three components.
fn parse_lenient_version(raw: &str) -> Result<Version> {
    let padded = match raw.split('.').count() {
        1 => format!("{raw}.0.0"),
        2 => format!("{raw}.0"),
        _ => raw.to_string(),
    };
    Version::parse(&padded).map_err(|e| {
        ScfError::ValidationError(format!("Cannot parse version from '{raw}': {e}"))
    })
}
