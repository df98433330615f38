// scf-core/src/process.rs
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use scf_common::error::{Result, ScfError};
use tokio::process::Command;
use tracing::{debug, error};

/// A subprocess invocation: program plus structured argument list, no shell.
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub envs: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.envs.push((key.to_string(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Last `max_lines` lines of stdout followed by stderr.
    pub fn combined_tail(&self, max_lines: usize) -> String {
        let lines: Vec<&str> = self
            .stdout
            .lines()
            .chain(self.stderr.lines())
            .filter(|l| !l.trim().is_empty())
            .collect();
        let start = lines.len().saturating_sub(max_lines);
        lines[start..].join("\n")
    }
}

/// Runs `spec` to completion and captures its output. A non-zero exit is not
/// an error here; callers decide what it means.
pub async fn run_command(spec: &CommandSpec) -> Result<CommandOutput> {
    debug!(
        "Running command: {} {:?} (cwd: {:?}, envs: {:?})",
        spec.program.display(),
        spec.args,
        spec.cwd,
        spec.envs.iter().map(|(k, _)| k).collect::<Vec<_>>()
    );

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args);
    cmd.kill_on_drop(true);
    if let Some(dir) = &spec.cwd {
        cmd.current_dir(dir);
    }
    cmd.envs(spec.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.stdin(Stdio::null());

    let output_future = cmd.output();
    let output = match spec.timeout {
        Some(limit) => match tokio::time::timeout(limit, output_future).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Command {} timed out after {:?}",
                    spec.program.display(),
                    limit
                );
                return Err(ScfError::CommandExecError(format!(
                    "{} timed out after {}s",
                    spec.program.display(),
                    limit.as_secs()
                )));
            }
        },
        None => output_future.await,
    }
    .map_err(|e| {
        error!("Failed to execute {}: {}", spec.program.display(), e);
        ScfError::CommandExecError(format!("{}: {e}", spec.program.display()))
    })?;

    let result = CommandOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    if result.success() {
        debug!("Command finished successfully.");
    } else {
        debug!("Command failed with status: {}", output.status);
        if !result.stderr.trim().is_empty() {
            debug!("Stderr:\n{}", result.stderr.trim());
        }
    }
    Ok(result)
}
