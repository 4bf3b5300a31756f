//! CLI-specific error types

use std::fmt;
use std::io;

use crate::engine::EngineError;
use crate::error::ClassifiedError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Already initialized
    AlreadyInitialized,
    /// Not initialized
    NotInitialized,
    /// Engine failed to open
    BootFailed,
    /// The operation was refused; carries the domain error code
    Rejected(&'static str),
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "BALLOT_CLI_CONFIG_ERROR",
            Self::IoError => "BALLOT_CLI_IO_ERROR",
            Self::AlreadyInitialized => "BALLOT_CLI_ALREADY_INITIALIZED",
            Self::NotInitialized => "BALLOT_CLI_NOT_INITIALIZED",
            Self::BootFailed => "BALLOT_CLI_BOOT_FAILED",
            Self::Rejected(code) => *code,
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Already initialized
    pub fn already_initialized() -> Self {
        Self::new(
            CliErrorCode::AlreadyInitialized,
            "Data directory already initialized",
        )
    }

    /// Not initialized
    pub fn not_initialized() -> Self {
        Self::new(
            CliErrorCode::NotInitialized,
            "Data directory not initialized. Run 'ballotdb init' first.",
        )
    }

    /// Engine open failed
    pub fn boot_failed(err: EngineError) -> Self {
        match err {
            EngineError::Config(msg) => Self::config_error(msg),
            other => Self::new(CliErrorCode::BootFailed, other.to_string()),
        }
    }

    /// A refused or failed domain operation
    pub fn rejected<E: ClassifiedError>(err: E) -> Self {
        Self::new(CliErrorCode::Rejected(err.code()), err.to_string())
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ballot::LedgerError;

    #[test]
    fn test_rejected_carries_domain_code() {
        let err = CliError::rejected(LedgerError::EmptyBallot);
        assert_eq!(err.code_str(), "BALLOT_EMPTY");
        assert!(err.to_string().starts_with("BALLOT_EMPTY: "));
    }

    #[test]
    fn test_config_errors_keep_their_code() {
        let err = CliError::boot_failed(EngineError::config("bad"));
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
    }
}
