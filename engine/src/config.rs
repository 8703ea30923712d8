//! Configuration loading.
//!
//! Configuration is stored as TOML. Lookup order when no path is given:
//! - `<config dir>/winmigrate/config.toml` (`~/.config` on Linux, `%APPDATA%` on Windows)
//! - `./winmigrate.toml`
//!
//! Missing files yield defaults. Command-line flags are layered on top with
//! [`TransferConfig::apply_overrides`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::EngineError;
use crate::model::{ResumePolicy, TransferOptions, DEFAULT_CHUNK_SIZE, DEFAULT_TIMEOUT};

const CONFIG_DIR_NAME: &str = "winmigrate";
const CONFIG_FILE_NAME: &str = "config.toml";
const LOCAL_CONFIG_FILE_NAME: &str = "winmigrate.toml";

/// Settings for the transfer engine and its front ends.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Seconds to keep retrying transient failures
    #[serde(alias = "timeout")]
    pub timeout_secs: u64,

    /// Bytes per chunk
    #[serde(alias = "chunk-size")]
    pub chunk_size: usize,

    /// Log level name: error, warn, info, debug or trace
    pub verbosity: String,

    /// Optional log file, appended to alongside stderr output
    #[serde(alias = "log-path")]
    pub log_path: Option<PathBuf>,

    /// How much of an existing destination to trust on resume
    #[serde(alias = "resume-policy")]
    pub resume_policy: ResumePolicy,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            verbosity: "info".to_string(),
            log_path: None,
            resume_policy: ResumePolicy::TrustLength,
        }
    }
}

/// Values supplied on the command line; `None` keeps the configured value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub timeout_secs: Option<u64>,
    pub chunk_size: Option<usize>,
    pub verbosity: Option<String>,
    pub log_path: Option<PathBuf>,
}

impl TransferConfig {
    /// Load configuration from `path`, or from the first default location that exists.
    ///
    /// # Errors
    /// An explicitly given path that does not exist, or any file that cannot
    /// be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, EngineError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match default_config_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::from_file(&path),
            None => {
                debug!("no configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path).map_err(|e| EngineError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = Self::from_toml(&content).map_err(|message| EngineError::ConfigParse {
            path: path.to_path_buf(),
            message,
        })?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    fn from_toml(content: &str) -> Result<Self, String> {
        let mut config: TransferConfig = toml::from_str(content).map_err(|e| e.to_string())?;
        config.verbosity = config.verbosity.to_lowercase();
        Ok(config)
    }

    /// Layer command-line values over the loaded configuration.
    pub fn apply_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(timeout) = overrides.timeout_secs {
            self.timeout_secs = timeout;
        }
        if let Some(chunk_size) = overrides.chunk_size {
            self.chunk_size = chunk_size;
        }
        if let Some(verbosity) = overrides.verbosity {
            self.verbosity = verbosity.to_lowercase();
        }
        if let Some(log_path) = overrides.log_path {
            self.log_path = Some(log_path);
        }
        self
    }

    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            chunk_size: self.chunk_size,
            timeout: Duration::from_secs(self.timeout_secs),
            resume_policy: self.resume_policy,
        }
    }
}

/// Default configuration file locations, in lookup order.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from(LOCAL_CONFIG_FILE_NAME));
    paths
}
