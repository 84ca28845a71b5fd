//! Run configuration
//!
//! JSON file, every field optional. A missing file at the default location
//! means defaults; a file that was named explicitly must exist and parse.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::migration::{MigrationMode, MigrationOptions, DEFAULT_PROGRESS_INTERVAL};
use crate::observability::Severity;

use super::errors::{CliError, CliResult};

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Checkpoint to read (default "./root.checkpoint")
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: PathBuf,

    /// Output store (default "./ledger.redb")
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Nodes between progress lines (default 50000)
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,

    /// Write resolved values into the `resolved` table (default false)
    #[serde(default)]
    pub persist_resolved: bool,

    /// Minimum log severity (default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_checkpoint_path() -> PathBuf {
    PathBuf::from("./root.checkpoint")
}
fn default_store_path() -> PathBuf {
    PathBuf::from("./ledger.redb")
}
fn default_progress_interval() -> u64 {
    DEFAULT_PROGRESS_INTERVAL
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            checkpoint_path: default_checkpoint_path(),
            store_path: default_store_path(),
            progress_interval: default_progress_interval(),
            persist_resolved: false,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load `path`, or defaults when `path` is the default location and absent.
    pub fn load_or_default(path: &Path, default_path: &Path) -> CliResult<Self> {
        if path == default_path && !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Validate field values
    fn validate(&self) -> CliResult<()> {
        if self.progress_interval == 0 {
            return Err(CliError::config_error("progress_interval must be > 0"));
        }

        if self.log_severity().is_none() {
            return Err(CliError::config_error(format!(
                "Invalid log_level: '{}'. Expected trace, info, warn or error.",
                self.log_level
            )));
        }

        Ok(())
    }

    /// Parsed `log_level`
    pub fn log_severity(&self) -> Option<Severity> {
        match Severity::parse(&self.log_level)? {
            Severity::Fatal => None,
            severity => Some(severity),
        }
    }

    /// Migration options for `mode`
    pub fn migration_options(&self, mode: MigrationMode) -> MigrationOptions {
        MigrationOptions {
            mode,
            progress_interval: self.progress_interval,
            persist_resolved: self.persist_resolved,
        }
    }
}
