//! Configuration management for the backup trigger.
//!
//! Loads configuration from an optional TOML file, then applies environment
//! variable overrides. Command-line flags are applied last by the binary.

use crate::executor::Compression;
use crate::utils::errors::{Result, TriggerError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Overrides `history.log_file`.
pub const ENV_LOG_FILE: &str = "BACKUP_TRIGGER_LOG_FILE";
/// Overrides `archive.program`.
pub const ENV_ARCHIVER: &str = "BACKUP_TRIGGER_ARCHIVER";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub history: HistoryConfig,
    pub archive: ArchiveConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// History log location, relative paths resolve against the working directory
    pub log_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Archiver executable, invoked with tar-compatible arguments
    pub program: String,

    /// Compression algorithm (gzip, zstd, none)
    pub compression: Compression,

    /// Kill the archiver after this many seconds (unset = wait indefinitely)
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

// Default values
fn default_log_file() -> PathBuf {
    PathBuf::from("backup_log.txt")
}

fn default_program() -> String {
    "tar".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            compression: Compression::default(),
            timeout_secs: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ArchiveConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TriggerError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
            .map_err(|e| TriggerError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse and validate configuration text
    pub fn from_toml(content: &str) -> std::result::Result<Self, String> {
        let config: Config = toml::from_str(content).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `BACKUP_TRIGGER_*` variables, looked up through `lookup`
    /// (`|key| std::env::var(key).ok()` in the binary). Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(log_file) = lookup(ENV_LOG_FILE).filter(|v| !v.is_empty()) {
            self.history.log_file = PathBuf::from(log_file);
        }
        if let Some(program) = lookup(ENV_ARCHIVER).filter(|v| !v.is_empty()) {
            self.archive.program = program;
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.history.log_file.as_os_str().is_empty() {
            return Err("history.log_file must not be empty".to_string());
        }
        if self.archive.program.trim().is_empty() {
            return Err("archive.program must not be empty".to_string());
        }
        if self.archive.timeout_secs == Some(0) {
            return Err("archive.timeout_secs must be greater than zero".to_string());
        }
        Ok(())
    }
}
