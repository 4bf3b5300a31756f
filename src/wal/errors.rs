//! WAL error types
//!
//! Error codes:
//! - BALLOT_WAL_APPEND_FAILED (ERROR severity)
//! - BALLOT_WAL_FSYNC_FAILED (FATAL severity)
//! - BALLOT_WAL_CORRUPTION (FATAL severity)

use std::fmt;
use std::io;

/// Severity levels for WAL errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, process continues
    Error,
    /// The store must stop accepting commits
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

/// WAL-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalErrorCode {
    /// WAL write failed
    AppendFailed,
    /// WAL fsync failed
    FsyncFailed,
    /// Framing, checksum or ordering violation
    Corruption,
}

impl WalErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            WalErrorCode::AppendFailed => "BALLOT_WAL_APPEND_FAILED",
            WalErrorCode::FsyncFailed => "BALLOT_WAL_FSYNC_FAILED",
            WalErrorCode::Corruption => "BALLOT_WAL_CORRUPTION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            WalErrorCode::AppendFailed => Severity::Error,
            WalErrorCode::FsyncFailed | WalErrorCode::Corruption => Severity::Fatal,
        }
    }
}

impl fmt::Display for WalErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// WAL error with code, message and context
#[derive(Debug)]
pub struct WalError {
    code: WalErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl WalError {
    /// A write to the WAL file failed
    pub fn append_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: WalErrorCode::AppendFailed,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    /// fsync after a WAL write failed
    pub fn fsync_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: WalErrorCode::FsyncFailed,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    /// The WAL contents are not a valid record sequence
    pub fn corruption(message: impl Into<String>) -> Self {
        Self {
            code: WalErrorCode::Corruption,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Corruption with commit identity context
    pub fn corruption_at_commit(commit_id: u64, reason: impl Into<String>) -> Self {
        Self {
            code: WalErrorCode::Corruption,
            message: reason.into(),
            details: Some(format!("commit_id: {}", commit_id)),
            source: None,
        }
    }

    /// Corruption with byte offset context
    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            code: WalErrorCode::Corruption,
            message: reason.into(),
            details: Some(format!("byte_offset: {}", offset)),
            source: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> WalErrorCode {
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

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns whether this error must halt the store
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for WalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for WalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for WAL operations
pub type WalResult<T> = Result<T, WalError>;
