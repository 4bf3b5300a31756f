//! Tally errors

use thiserror::Error;

use crate::error::{ClassifiedError, ErrorCategory};
use crate::schema::ElectionId;

pub type TallyResult<T> = Result<T, TallyError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TallyError {
    #[error("Election {0} does not exist")]
    ElectionNotFound(ElectionId),
}

impl ClassifiedError for TallyError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Validation
    }

    fn code(&self) -> &'static str {
        match self {
            TallyError::ElectionNotFound(_) => "BALLOT_ELECTION_NOT_FOUND",
        }
    }

    fn is_retryable(&self) -> bool {
        false
    }
}
