// scf-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::BaseDirs;
use tracing::debug;

use super::error::{Result, ScfError};

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct Config {
    pub prefix: PathBuf,
    /// Plain `http://` source URLs are rejected unless this is set.
    pub allow_http: bool,
    pub fetch_timeout: Duration,
    pub connect_timeout: Duration,
    pub build_timeout: Option<Duration>,
    /// Explicit cargo executable; otherwise `cargo` is looked up on PATH.
    pub cargo_override: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading scf configuration");

        let prefix = match non_empty_var("SCF_PREFIX").or_else(|| non_empty_var("HOMEBREW_PREFIX"))
        {
            Some(p) => PathBuf::from(p),
            None => {
                let base = BaseDirs::new().ok_or_else(|| {
                    ScfError::Config(
                        "Could not determine a home directory; set SCF_PREFIX".to_string(),
                    )
                })?;
                let fallback = base.data_local_dir().join("scf");
                debug!(
                    "SCF_PREFIX and HOMEBREW_PREFIX not set, falling back to {}",
                    fallback.display()
                );
                fallback
            }
        };
        debug!("Effective prefix set to: {}", prefix.display());

        let allow_http = env::var("SCF_ALLOW_HTTP").is_ok_and(|v| v == "1");
        let fetch_timeout =
            duration_var("SCF_FETCH_TIMEOUT")?.unwrap_or(DEFAULT_FETCH_TIMEOUT);
        let build_timeout = duration_var("SCF_BUILD_TIMEOUT")?;
        let cargo_override = non_empty_var("SCF_CARGO").map(PathBuf::from);

        debug!("Configuration loaded successfully.");
        Ok(Self {
            prefix,
            allow_http,
            fetch_timeout,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            build_timeout,
            cargo_override,
        })
    }

    /// Configuration rooted at `prefix` with default policy, ignoring the
    /// environment.
    pub fn with_prefix(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            allow_http: false,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            build_timeout: None,
            cargo_override: None,
        }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.prefix.join("bin")
    }

    pub fn cellar_dir(&self) -> PathBuf {
        self.prefix.join("Cellar")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.prefix.join("scf_cache")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.prefix.join("scf_logs")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.prefix.join("tmp")
    }

    pub fn formula_cellar_dir(&self, formula_name: &str) -> PathBuf {
        self.cellar_dir().join(formula_name)
    }

    pub fn formula_keg_path(&self, formula_name: &str, version_str: &str) -> PathBuf {
        self.formula_cellar_dir(formula_name).join(version_str)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn duration_var(key: &str) -> Result<Option<Duration>> {
    match non_empty_var(key) {
        Some(raw) => humantime::parse_duration(raw.trim())
            .map(Some)
            .map_err(|e| ScfError::Config(format!("Invalid duration in {key}='{raw}': {e}"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keg_paths_follow_cellar_layout() {
        let config = Config::with_prefix("/opt/scf");
        assert_eq!(config.bin_dir(), PathBuf::from("/opt/scf/bin"));
        assert_eq!(
            config.formula_keg_path("spacecleaner", "0.1.0"),
            PathBuf::from("/opt/scf/Cellar/spacecleaner/0.1.0")
        );
        assert!(!config.allow_http);
        assert!(config.build_timeout.is_none());
    }

    #[test]
    fn duration_var_rejects_garbage() {
        // Unique key so parallel tests never race on it.
        let key = "SCF_TEST_DURATION_VAR_GARBAGE";
        env::set_var(key, "soon");
        let err = duration_var(key).unwrap_err();
        env::remove_var(key);
        assert!(matches!(err, ScfError::Config(_)));
    }

    #[test]
    fn duration_var_parses_humantime() {
        let key = "SCF_TEST_DURATION_VAR_OK";
        env::set_var(key, "2m 30s");
        let parsed = duration_var(key).unwrap();
        env::remove_var(key);
        assert_eq!(parsed, Some(Duration::from_secs(150)));
    }
}
