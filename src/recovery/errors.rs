//! Recovery error types
//!
//! Error codes (all FATAL):
//! - BALLOT_RECOVERY_WAL_CORRUPTION
//! - BALLOT_RECOVERY_INVALID_PAYLOAD
//! - BALLOT_RECOVERY_CONSTRAINT
//! - BALLOT_RECOVERY_COMMIT_ORDER

use std::fmt;

/// Severity levels for recovery errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The store must not open
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Recovery-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryErrorCode {
    /// WAL framing, checksum or ordering is broken
    WalCorruption,
    /// A record's payload is not a mutation batch
    InvalidPayload,
    /// A replayed batch violates a store constraint
    Constraint,
    /// Commit identities do not form a gapless sequence
    CommitOrder,
}

impl RecoveryErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            RecoveryErrorCode::WalCorruption => "BALLOT_RECOVERY_WAL_CORRUPTION",
            RecoveryErrorCode::InvalidPayload => "BALLOT_RECOVERY_INVALID_PAYLOAD",
            RecoveryErrorCode::Constraint => "BALLOT_RECOVERY_CONSTRAINT",
            RecoveryErrorCode::CommitOrder => "BALLOT_RECOVERY_COMMIT_ORDER",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

impl fmt::Display for RecoveryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Recovery error type with full context
#[derive(Debug)]
pub struct RecoveryError {
    code: RecoveryErrorCode,
    message: String,
    offset: Option<u64>,
    commit_id: Option<u64>,
}

impl RecoveryError {
    /// WAL corruption detected while reading
    pub fn wal_corruption(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            code: RecoveryErrorCode::WalCorruption,
            message: format!("WAL corruption at offset {}: {}", offset, reason.into()),
            offset: Some(offset),
            commit_id: None,
        }
    }

    /// Payload of a checksummed record failed to decode
    pub fn invalid_payload(commit_id: u64, reason: impl Into<String>) -> Self {
        Self {
            code: RecoveryErrorCode::InvalidPayload,
            message: format!("Commit {} payload is not a mutation batch: {}", commit_id, reason.into()),
            offset: None,
            commit_id: Some(commit_id),
        }
    }

    /// Replayed batch was rejected by the tables
    pub fn constraint(commit_id: u64, reason: impl Into<String>) -> Self {
        Self {
            code: RecoveryErrorCode::Constraint,
            message: format!("Commit {} does not replay cleanly: {}", commit_id, reason.into()),
            offset: None,
            commit_id: Some(commit_id),
        }
    }

    /// Commit authority refused a replayed identity
    pub fn commit_order(commit_id: u64, reason: impl Into<String>) -> Self {
        Self {
            code: RecoveryErrorCode::CommitOrder,
            message: reason.into(),
            offset: None,
            commit_id: Some(commit_id),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> RecoveryErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the byte offset if applicable
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    /// Returns the commit identity if applicable
    pub fn commit_id(&self) -> Option<u64> {
        self.commit_id
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        true
    }
}

impl fmt::Display for RecoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for RecoveryError {}

/// Result type for recovery operations
pub type RecoveryResult<T> = Result<T, RecoveryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_errors_are_fatal() {
        let codes = [
            RecoveryErrorCode::WalCorruption,
            RecoveryErrorCode::InvalidPayload,
            RecoveryErrorCode::Constraint,
            RecoveryErrorCode::CommitOrder,
        ];

        for code in codes {
            assert_eq!(code.severity(), Severity::Fatal);
        }
    }

    #[test]
    fn test_error_display() {
        let err = RecoveryError::wal_corruption(1234, "checksum mismatch");
        let display = format!("{}", err);
        assert!(display.contains("BALLOT_RECOVERY_WAL_CORRUPTION"));
        assert!(display.contains("FATAL"));
        assert!(display.contains("1234"));
    }
}
