//! Source tarballs, formulas and a scripted build system for pipeline tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::Compression;
use scf_common::config::Config;
use scf_common::error::{Result, ScfError};
use scf_common::formulary::SPACECLEANER_CAVEATS;
use scf_common::model::{BuildDependency, Formula, FormulaTest};
use scf_core::build::{BuildRequest, BuildSystem};
use scf_core::process::CommandOutput;
use sha2::{Digest, Sha256};

/// A GitHub-style tag archive: everything under `spacecleaner-0.1.0/`.
pub fn source_tarball() -> Vec<u8> {
    let files: [(&str, &[u8]); 2] = [
        (
            "spacecleaner-0.1.0/Cargo.toml",
            &b"[package]\nname = \"spacecleaner\"\nversion = \"0.1.0\"\n"[..],
        ),
        (
            "spacecleaner-0.1.0/src/main.rs",
            &b"fn main() { println!(\"spacecleaner 0.1.0\"); }\n"[..],
        ),
    ];
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_path(path).unwrap();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// The spacecleaner formula pointed at a local archive URL.
pub fn local_formula(url: &str, sha256: &str) -> Formula {
    Formula::new("spacecleaner", url, sha256)
        .with_license("MIT")
        .with_build_dependency(BuildDependency::build("rust"))
        .with_caveats(SPACECLEANER_CAVEATS)
        .with_test(FormulaTest {
            binary: None,
            args: vec!["--version".to_string()],
            expect: "spacecleaner".to_string(),
        })
}

pub fn local_config(prefix: &Path) -> Config {
    let mut config = Config::with_prefix(prefix);
    config.allow_http = true;
    config
}

/// Build system that installs a shell script instead of compiling anything.
#[derive(Debug, Clone)]
pub struct ScriptedBuild {
    calls: Arc<AtomicUsize>,
    toolchain_missing: bool,
    fail: bool,
    version_output: String,
}

impl Default for ScriptedBuild {
    fn default() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            toolchain_missing: false,
            fail: false,
            version_output: "spacecleaner 0.1.0".to_string(),
        }
    }
}

impl ScriptedBuild {
    pub fn without_toolchain(mut self) -> Self {
        self.toolchain_missing = true;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn printing(mut self, version_output: &str) -> Self {
        self.version_output = version_output.to_string();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl BuildSystem for ScriptedBuild {
    fn name(&self) -> &str {
        "scripted"
    }

    fn locate_toolchain(&self, _formula: &Formula) -> Result<PathBuf> {
        if self.toolchain_missing {
            return Err(ScfError::MissingToolchain {
                dependency: "rust".to_string(),
                reason: "cargo not found on PATH".to_string(),
            });
        }
        Ok(PathBuf::from("/usr/bin/true"))
    }

    fn install_args(&self, request: &BuildRequest) -> Vec<String> {
        vec![
            "--root".to_string(),
            request.keg_path.display().to_string(),
        ]
    }

    async fn build(&self, _toolchain: &Path, request: &BuildRequest) -> Result<CommandOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(
            request.source_dir.join("Cargo.toml").is_file(),
            "source tree was not unpacked"
        );

        let bin = request.keg_path.join("bin");
        fs::create_dir_all(&bin)?;
        if self.fail {
            fs::write(bin.join("spacecleaner"), b"partial")?;
            return Err(ScfError::BuildFailure {
                exit_code: Some(101),
                output: "error: could not compile `spacecleaner`".to_string(),
            });
        }

        let script = bin.join("spacecleaner");
        fs::write(&script, format!("#!/bin/sh\necho \"{}\"\n", self.version_output))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755))?;
        }
        Ok(CommandOutput {
            exit_code: Some(0),
            stdout: String::new(),
            stderr: "Installed package `spacecleaner v0.1.0`".to_string(),
        })
    }
}
