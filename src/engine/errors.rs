//! Engine startup errors

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::identity::IdentityError;
use crate::storage::StorageError;

pub type EngineResult<T> = Result<T, EngineError>;

/// Failures opening an engine. Operation errors have their own types.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("Failed to open audit log {path}: {source}")]
    Audit {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl EngineError {
    pub fn config(message: impl Into<String>) -> Self {
        EngineError::Config(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Config(_) => "BALLOT_CONFIG_INVALID",
            EngineError::Storage(e) => e.code().code(),
            EngineError::Identity(_) => "BALLOT_ROSTER_INVALID",
            EngineError::Audit { .. } => "BALLOT_AUDIT_UNAVAILABLE",
        }
    }
}
