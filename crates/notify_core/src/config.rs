//! Runtime configuration for hosts embedding the notification core.
//!
//! # Responsibility
//! - Describe where notifications are stored and how logs are written.
//! - Resolve settings from `NOTIFY_*` environment variables.
//!
//! # Invariants
//! - `db_path = None` selects the in-memory store.
//! - `log_dir = None` leaves logging uninitialized.

use crate::logging::{default_log_level, init_logging, normalize_level};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "NOTIFY_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "NOTIFY_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "NOTIFY_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// SQLite file backing the store.
    pub db_path: Option<PathBuf>,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rotated log files.
    pub log_dir: Option<PathBuf>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl NotifyConfig {
    /// Builds a config from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Blank values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let defaults = Self::default();
        Self {
            db_path: read(ENV_DB_PATH).map(PathBuf::from),
            log_level: read(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_dir: read(ENV_LOG_DIR).map(PathBuf::from),
        }
    }

    /// Checks values that would otherwise fail later at startup.
    pub fn validate(&self) -> Result<(), String> {
        normalize_level(&self.log_level)?;
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(format!(
                    "log_dir must be an absolute path, got `{}`",
                    dir.display()
                ));
            }
        }
        Ok(())
    }

    /// Starts file logging when `log_dir` is configured.
    ///
    /// Returns `Ok(false)` when logging is not configured.
    pub fn init_logging(&self) -> Result<bool, String> {
        let Some(dir) = &self.log_dir else {
            return Ok(false);
        };
        let dir = dir
            .to_str()
            .ok_or_else(|| format!("log_dir `{}` is not valid UTF-8", dir.display()))?;
        init_logging(&self.log_level, dir)?;
        Ok(true)
    }
}
