//! Error taxonomy shared by the domain errors
//!
//! Every domain error names one category. Callers branch on the category
//! to decide between surfacing, retrying and halting.

use std::fmt;

use serde::Serialize;

/// How a caller should treat a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// The request itself is malformed. Never retried.
    Validation,
    /// The request collides with committed state. Transient or permanent
    /// depending on the error.
    Conflict,
    /// The target is in a phase or state that forbids the request.
    State,
    /// The store or WAL failed. Retried by the caller as a whole.
    Storage,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Conflict => "conflict",
            ErrorCategory::State => "state",
            ErrorCategory::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common surface of `LedgerError`, `LifecycleError` and `TallyError`.
pub trait ClassifiedError: std::error::Error {
    fn category(&self) -> ErrorCategory;

    /// Stable `BALLOT_*` code.
    fn code(&self) -> &'static str;

    /// Whether repeating the whole operation may succeed.
    fn is_retryable(&self) -> bool;
}
