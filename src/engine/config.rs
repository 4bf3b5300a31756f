//! Engine configuration
//!
//! A JSON file:
//!
//! ```json
//! {
//!   "data_dir": "/var/lib/ballotdb",
//!   "wal_sync_mode": "fsync",
//!   "audit_log_path": "/var/log/ballotdb/audit.log",
//!   "roster_path": "/etc/ballotdb/roster.json",
//!   "max_conflict_retries": 3,
//!   "log_level": "INFO"
//! }
//! ```
//!
//! Only `data_dir` is required.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::observability::{log_event_with_fields, Event, Severity};

use super::errors::{EngineError, EngineResult};

/// Upper bound on whole-ballot retries after a transient conflict.
pub const MAX_CONFLICT_RETRIES_LIMIT: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Data directory (required)
    pub data_dir: PathBuf,

    /// WAL sync mode. Only "fsync" is accepted.
    #[serde(default = "default_wal_sync_mode")]
    pub wal_sync_mode: String,

    /// Audit log file (default `<data_dir>/audit/audit.log`)
    #[serde(default)]
    pub audit_log_path: Option<PathBuf>,

    /// Voter roster. Without one no voter is eligible.
    #[serde(default)]
    pub roster_path: Option<PathBuf>,

    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_wal_sync_mode() -> String {
    "fsync".to_string()
}
fn default_max_conflict_retries() -> u32 {
    3
}
fn default_log_level() -> String {
    "INFO".to_string()
}

impl EngineConfig {
    /// Defaults for `data_dir`.
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            wal_sync_mode: default_wal_sync_mode(),
            audit_log_path: None,
            roster_path: None,
            max_conflict_retries: default_max_conflict_retries(),
            log_level: default_log_level(),
        }
    }

    /// Load and validate configuration from file
    pub fn load(path: &Path) -> EngineResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| EngineError::config(format!("Failed to read config: {}", e)))?;

        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| EngineError::config(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        log_event_with_fields(
            Event::ConfigLoaded,
            &[("data_dir", &config.data_dir.display().to_string())],
        );
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(EngineError::config("data_dir must not be empty"));
        }

        if self.wal_sync_mode != "fsync" {
            return Err(EngineError::config(format!(
                "Invalid wal_sync_mode: '{}'. Only 'fsync' is allowed.",
                self.wal_sync_mode
            )));
        }

        if self.max_conflict_retries > MAX_CONFLICT_RETRIES_LIMIT {
            return Err(EngineError::config(format!(
                "max_conflict_retries must be <= {}",
                MAX_CONFLICT_RETRIES_LIMIT
            )));
        }

        self.min_severity()?;
        Ok(())
    }

    pub fn min_severity(&self) -> EngineResult<Severity> {
        self.log_level.parse().map_err(EngineError::config)
    }

    pub fn audit_path(&self) -> PathBuf {
        self.audit_log_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("audit").join("audit.log"))
    }
}
