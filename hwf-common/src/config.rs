// hwf-common/src/config.rs
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use super::error::{HwfError, Result};

const DEFAULT_DOWNLOAD_DIR_NAME: &str = "tool";
const HISTORY_DIR_NAME: &str = "history";
const LEDGER_FILENAME: &str = "version.txt";
const LOGS_DIR_NAME: &str = "logs";

pub const DEFAULT_RETENTION: usize = 5;
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct Config {
    pub download_dir: PathBuf,
    /// Archived copies kept per artifact name.
    pub retention: usize,
    pub max_retries: u32,
    /// Wait before retry `i` is `backoff_base * 2^i`.
    pub backoff_base: Duration,
}

impl Config {
    /// Resolves the download root from `dir_override`, then `HWF_DOWNLOAD_DIR`,
    /// then `<cwd>/tool`.
    pub fn load(dir_override: Option<&Path>) -> Result<Self> {
        debug!("Loading hwf configuration");

        let download_dir = match dir_override {
            Some(dir) => dir.to_path_buf(),
            None => match env::var("HWF_DOWNLOAD_DIR").ok().filter(|s| !s.is_empty()) {
                Some(dir) => PathBuf::from(dir),
                None => {
                    let cwd = env::current_dir().map_err(|e| {
                        HwfError::Config(format!("Could not determine current directory: {e}"))
                    })?;
                    debug!(
                        "HWF_DOWNLOAD_DIR not set, falling back to {}/{}",
                        cwd.display(),
                        DEFAULT_DOWNLOAD_DIR_NAME
                    );
                    cwd.join(DEFAULT_DOWNLOAD_DIR_NAME)
                }
            },
        };
        debug!("Effective download dir set to: {}", download_dir.display());

        let retention = env_number("HWF_RETENTION", DEFAULT_RETENTION)
            .filter(|n| *n > 0)
            .unwrap_or_else(|| {
                warn!("HWF_RETENTION must be at least 1, using {DEFAULT_RETENTION}");
                DEFAULT_RETENTION
            });
        let max_retries = env_number("HWF_MAX_RETRIES", DEFAULT_MAX_RETRIES)
            .unwrap_or(DEFAULT_MAX_RETRIES);

        Ok(Self::with_download_dir(download_dir)
            .retention(retention)
            .max_retries(max_retries))
    }

    /// Config rooted at `download_dir` with default tunables and no env lookups.
    pub fn with_download_dir(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            retention: DEFAULT_RETENTION,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }

    pub fn retention(mut self, retention: usize) -> Self {
        self.retention = retention;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn history_dir(&self) -> PathBuf {
        self.download_dir.join(HISTORY_DIR_NAME)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.download_dir.join(LEDGER_FILENAME)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.download_dir.join(LOGS_DIR_NAME)
    }

    pub fn active_artifact_path(&self, save_file_name: &str) -> PathBuf {
        self.download_dir.join(save_file_name)
    }

    /// Creates the download dir, the history dir and an empty ledger when absent.
    pub fn ensure_layout(&self) -> Result<()> {
        for dir in [self.download_dir.clone(), self.history_dir()] {
            if !dir.exists() {
                debug!("Creating directory: {}", dir.display());
                fs::create_dir_all(&dir).map_err(|e| {
                    HwfError::IoError(format!(
                        "Failed to create directory {}: {}",
                        dir.display(),
                        e
                    ))
                })?;
            }
        }
        let ledger = self.ledger_path();
        if !ledger.exists() {
            debug!("Creating empty ledger: {}", ledger.display());
            fs::File::create(&ledger).map_err(|e| {
                HwfError::IoError(format!(
                    "Failed to create ledger {}: {}",
                    ledger.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}

/// `Some(default)` when unset, `None` when set but unparsable.
fn env_number<T: std::str::FromStr>(key: &str, default: T) -> Option<T> {
    match env::var(key) {
        Ok(raw) => {
            let parsed = raw.trim().parse::<T>().ok();
            if parsed.is_none() {
                warn!("Ignoring invalid value for {key}: '{raw}'");
            }
            parsed
        }
        Err(_) => Some(default),
    }
}
