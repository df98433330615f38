// scf-core/src/installer.rs
//! The install pipeline: locate, fetch, verify, build, report. Every stage
//! runs to completion before the next starts; any error is fatal and moves the
//! run to `Failed`.

use std::path::{Path, PathBuf};

use scf_common::config::Config;
use scf_common::error::{Result, ScfError};
use scf_common::model::{Formula, InstallReceipt};
use scf_common::pipeline::{InstallState, PipelineEvent};
use tokio::sync::broadcast;
use tracing::{debug, error, instrument};

use crate::build::{BuildRequest, BuildSystem};
use crate::extract::unpack_source;
use crate::keg::{link_executables, KegGuard};
use crate::locate::{locate, SourceLocation};
use crate::process::CommandOutput;
use crate::staging::Staging;
use crate::test_step::run_formula_test;

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Replaces the formula's checksum.
    pub sha256_override: Option<String>,
    /// Run the formula test after the build.
    pub run_test: bool,
    /// Keep the staging directory instead of removing it.
    pub keep_staging: bool,
    /// Skip linking executables into the prefix `bin`.
    pub skip_link: bool,
}

#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub state: InstallState,
    pub name: String,
    pub version: String,
    pub sha256: String,
    pub keg_path: PathBuf,
    pub links: Vec<PathBuf>,
    pub build_output: CommandOutput,
    pub test_output: Option<String>,
    pub kept_staging: Option<PathBuf>,
}

/// Result of fetching and verifying without building.
#[derive(Debug, Clone)]
pub struct VerifiedArchive {
    pub location: SourceLocation,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub sha256: String,
}

pub struct Installer<'a, B: BuildSystem> {
    config: &'a Config,
    build_system: B,
    events: Option<broadcast::Sender<PipelineEvent>>,
    state: InstallState,
}

impl<'a, B: BuildSystem> Installer<'a, B> {
    pub fn new(config: &'a Config, build_system: B) -> Self {
        Self {
            config,
            build_system,
            events: None,
            state: InstallState::Pending,
        }
    }

    pub fn with_events(mut self, events: broadcast::Sender<PipelineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> InstallState {
        self.state
    }

    pub fn build_system(&self) -> &B {
        &self.build_system
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.events {
            // No subscribers is fine.
            let _ = tx.send(event);
        }
    }

    fn transition(&mut self, next: InstallState) -> Result<()> {
        let from = self.state;
        self.state = from.advance(next)?;
        debug!("Install state {} -> {}", from, next);
        self.emit(PipelineEvent::StateChanged { from, to: next });
        Ok(())
    }

    fn record_failure(&mut self, err: &ScfError) {
        let from = self.state;
        self.state = from.fail();
        error!("Install failed in state {}: {}", from, err);
        self.emit(PipelineEvent::StateChanged {
            from,
            to: self.state,
        });
        self.emit(PipelineEvent::Failed {
            state: self.state,
            error: err.to_string(),
        });
    }

    /// Runs the whole pipeline for `formula`.
    #[instrument(skip_all, fields(formula = %formula.name()))]
    pub async fn install(
        &mut self,
        formula: &Formula,
        options: &InstallOptions,
    ) -> Result<InstallOutcome> {
        self.state = InstallState::Pending;
        match self.run_install(formula, options).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    /// Locate, fetch and verify only. The verified archive is copied into
    /// `dest_dir`; the pipeline stops at `Verified`.
    #[instrument(skip_all, fields(formula = %formula.name()))]
    pub async fn fetch_only(
        &mut self,
        formula: &Formula,
        sha256_override: Option<&str>,
        dest_dir: &Path,
    ) -> Result<VerifiedArchive> {
        self.state = InstallState::Pending;
        let result = self.run_fetch(formula, sha256_override, dest_dir).await;
        if let Err(e) = &result {
            self.record_failure(e);
        }
        result
    }

    async fn run_fetch(
        &mut self,
        formula: &Formula,
        sha256_override: Option<&str>,
        dest_dir: &Path,
    ) -> Result<VerifiedArchive> {
        let location = self.locate_stage(formula, sha256_override)?;
        let staging = Staging::create(self.config, formula.name())?;
        let (fetched_path, size_bytes) = self.fetch_stage(&location, &staging).await?;
        let sha256 = self.verify_stage(&location, &fetched_path)?;

        std::fs::create_dir_all(dest_dir)?;
        let path = dest_dir.join(format!("{}-{}", location.name, location.file_name));
        std::fs::copy(&fetched_path, &path)?;
        debug!("Cached verified archive at {}", path.display());
        Ok(VerifiedArchive {
            location,
            path,
            size_bytes,
            sha256,
        })
    }

    fn locate_stage(
        &mut self,
        formula: &Formula,
        sha256_override: Option<&str>,
    ) -> Result<SourceLocation> {
        let location = locate(formula, sha256_override)?;
        self.emit(PipelineEvent::Located {
            name: location.name.clone(),
            version: location.version.clone(),
            url: location.url.clone(),
        });
        self.transition(InstallState::Located)?;
        Ok(location)
    }

    async fn fetch_stage(
        &mut self,
        location: &SourceLocation,
        staging: &Staging,
    ) -> Result<(PathBuf, u64)> {
        self.emit(PipelineEvent::DownloadStarted {
            url: location.url.clone(),
        });
        let fetched = scf_net::fetch_archive(
            &location.name,
            &location.url,
            &staging.download_dir(),
            &location.file_name,
            self.config,
        )
        .await?;
        self.emit(PipelineEvent::DownloadFinished {
            path: fetched.path.clone(),
            size_bytes: fetched.size_bytes,
        });
        self.transition(InstallState::Fetched)?;
        Ok((fetched.path, fetched.size_bytes))
    }

    fn verify_stage(
        &mut self,
        location: &SourceLocation,
        archive_path: &Path,
    ) -> Result<String> {
        let sha256 = scf_net::verify_checksum(archive_path, &location.checksum)?;
        self.emit(PipelineEvent::ChecksumVerified {
            sha256: sha256.clone(),
        });
        self.transition(InstallState::Verified)?;
        Ok(sha256)
    }

    async fn run_install(
        &mut self,
        formula: &Formula,
        options: &InstallOptions,
    ) -> Result<InstallOutcome> {
        // Locate. The toolchain is checked here so a missing one fails before
        // anything is downloaded or spawned.
        let toolchain = self.build_system.locate_toolchain(formula)?;
        let location = self.locate_stage(formula, options.sha256_override.as_deref())?;

        let staging = Staging::create(self.config, formula.name())?;
        let (archive_path, _) = self.fetch_stage(&location, &staging).await?;
        let sha256 = self.verify_stage(&location, &archive_path)?;

        // Build
        let source_dir = unpack_source(&archive_path, location.kind, &staging.source_dir())?;
        let keg = KegGuard::prepare(
            self.config
                .formula_keg_path(&location.name, &location.version),
        )?;
        let request = BuildRequest {
            source_dir,
            keg_path: keg.path().to_path_buf(),
            scratch_dir: staging.scratch_dir(),
        };
        let build_args = self.build_system.install_args(&request);
        self.emit(PipelineEvent::BuildStarted {
            toolchain: toolchain.clone(),
            args: build_args.clone(),
        });
        let build_output = self.build_system.build(&toolchain, &request).await?;

        InstallReceipt {
            name: location.name.clone(),
            version: location.version.clone(),
            source_url: location.url.clone(),
            sha256: sha256.clone(),
            license: formula.license().to_string(),
            build_system: self.build_system.name().to_string(),
            build_args,
            installed_at: chrono::Utc::now().to_rfc3339(),
        }
        .write_to_keg(keg.path())?;

        self.transition(InstallState::Built)?;

        // Report. The smoke test runs before the keg is committed or linked.
        let test_output = if options.run_test {
            let output = run_formula_test(formula, keg.path()).await?;
            if let Some(stdout) = &output {
                self.emit(PipelineEvent::TestPassed {
                    output: stdout.clone(),
                });
            }
            output
        } else {
            None
        };

        let keg_path = keg.commit()?;
        self.emit(PipelineEvent::BuildFinished {
            keg_path: keg_path.clone(),
        });
        let links = if options.skip_link {
            Vec::new()
        } else {
            link_executables(&keg_path, &self.config.bin_dir(), &self.config.cellar_dir())?
        };
        if !links.is_empty() {
            self.emit(PipelineEvent::Linked {
                links: links.clone(),
            });
        }
        if let Some(text) = formula.caveats() {
            self.emit(PipelineEvent::Caveats {
                text: text.to_string(),
            });
        }
        self.transition(InstallState::Reported)?;

        let kept_staging = options.keep_staging.then(|| staging.keep());
        Ok(InstallOutcome {
            state: self.state,
            name: location.name,
            version: location.version,
            sha256,
            keg_path,
            links,
            build_output,
            test_output,
            kept_staging,
        })
    }
}
