//! Storage error types
//!
//! Error codes:
//! - BALLOT_STORAGE_CONSTRAINT (ERROR severity): a staged batch violated a
//!   named constraint; nothing was written
//! - BALLOT_STORAGE_WAL (ERROR or FATAL, from the WAL error)
//! - BALLOT_STORAGE_HALTED (FATAL): an earlier WAL failure halted the store
//! - BALLOT_STORAGE_CODEC (ERROR): a mutation batch could not be encoded
//! - BALLOT_STORAGE_RECOVERY (FATAL): the store could not be rebuilt at open
//! - BALLOT_STORAGE_LOCK_POISONED (FATAL)

use std::fmt;

use crate::recovery::RecoveryError;
use crate::wal::WalError;

/// Severity levels for storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, store continues
    Error,
    /// Store must be reopened
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Storage-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    Constraint,
    Wal,
    Halted,
    Codec,
    Recovery,
    LockPoisoned,
}

impl StorageErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::Constraint => "BALLOT_STORAGE_CONSTRAINT",
            StorageErrorCode::Wal => "BALLOT_STORAGE_WAL",
            StorageErrorCode::Halted => "BALLOT_STORAGE_HALTED",
            StorageErrorCode::Codec => "BALLOT_STORAGE_CODEC",
            StorageErrorCode::Recovery => "BALLOT_STORAGE_RECOVERY",
            StorageErrorCode::LockPoisoned => "BALLOT_STORAGE_LOCK_POISONED",
        }
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Kind of a named store constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    Check,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintKind::Unique => write!(f, "unique"),
            ConstraintKind::ForeignKey => write!(f, "foreign key"),
            ConstraintKind::Check => write!(f, "check"),
        }
    }
}

/// A rejected staged mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintViolation {
    /// Constraint name, e.g. `participation_voter_election`.
    pub constraint: &'static str,
    pub kind: ConstraintKind,
    pub detail: String,
}

impl ConstraintViolation {
    pub fn unique(constraint: &'static str, detail: impl Into<String>) -> Self {
        Self {
            constraint,
            kind: ConstraintKind::Unique,
            detail: detail.into(),
        }
    }

    pub fn foreign_key(constraint: &'static str, detail: impl Into<String>) -> Self {
        Self {
            constraint,
            kind: ConstraintKind::ForeignKey,
            detail: detail.into(),
        }
    }

    pub fn check(constraint: &'static str, detail: impl Into<String>) -> Self {
        Self {
            constraint,
            kind: ConstraintKind::Check,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} constraint '{}' violated: {}",
            self.kind, self.constraint, self.detail
        )
    }
}

#[derive(Debug)]
enum Source {
    Wal(WalError),
    Recovery(RecoveryError),
}

/// Storage error with code, message and context
#[derive(Debug)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    violation: Option<ConstraintViolation>,
    source: Option<Source>,
}

impl StorageError {
    /// A staged batch violated a constraint
    pub fn constraint(violation: ConstraintViolation) -> Self {
        Self {
            code: StorageErrorCode::Constraint,
            message: violation.to_string(),
            violation: Some(violation),
            source: None,
        }
    }

    /// The WAL append or fsync for a commit failed
    pub fn wal(source: WalError) -> Self {
        Self {
            code: StorageErrorCode::Wal,
            message: source.to_string(),
            violation: None,
            source: Some(Source::Wal(source)),
        }
    }

    /// The store refused a commit after an earlier WAL failure
    pub fn halted() -> Self {
        Self {
            code: StorageErrorCode::Halted,
            message: "Store halted after a WAL failure; reopen required".to_string(),
            violation: None,
            source: None,
        }
    }

    /// A mutation batch could not be encoded
    pub fn codec(message: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::Codec,
            message: message.into(),
            violation: None,
            source: None,
        }
    }

    /// Rebuilding the store from the WAL failed
    pub fn recovery(source: RecoveryError) -> Self {
        Self {
            code: StorageErrorCode::Recovery,
            message: source.to_string(),
            violation: None,
            source: Some(Source::Recovery(source)),
        }
    }

    /// A table lock was poisoned by a panicking thread
    pub fn lock_poisoned(what: &str) -> Self {
        Self {
            code: StorageErrorCode::LockPoisoned,
            message: format!("{} lock poisoned", what),
            violation: None,
            source: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        match (&self.code, &self.source) {
            (StorageErrorCode::Wal, Some(Source::Wal(e))) if !e.is_fatal() => Severity::Error,
            (StorageErrorCode::Constraint, _) | (StorageErrorCode::Codec, _) => Severity::Error,
            _ => Severity::Fatal,
        }
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the violated constraint, if that is why the commit failed
    pub fn violation(&self) -> Option<&ConstraintViolation> {
        self.violation.as_ref()
    }

    /// Returns the name of the violated constraint, if any
    pub fn constraint_name(&self) -> Option<&'static str> {
        self.violation.as_ref().map(|v| v.constraint)
    }

    /// Returns whether this error is fatal (requires reopening the store)
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.source {
            Some(Source::Wal(e)) => Some(e),
            Some(Source::Recovery(e)) => Some(e),
            None => None,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_error_is_not_fatal() {
        let err = StorageError::constraint(ConstraintViolation::unique(
            "participation_voter_election",
            "voter already recorded",
        ));
        assert!(!err.is_fatal());
        assert_eq!(err.constraint_name(), Some("participation_voter_election"));
        assert!(err.to_string().contains("BALLOT_STORAGE_CONSTRAINT"));
    }

    #[test]
    fn test_halted_is_fatal() {
        let err = StorageError::halted();
        assert!(err.is_fatal());
        assert_eq!(err.code().code(), "BALLOT_STORAGE_HALTED");
    }
}
