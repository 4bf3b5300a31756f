//! Lifecycle and administration errors

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::{ClassifiedError, ErrorCategory};
use crate::schema::{CandidateId, ElectionId, ElectionPhase, PositionId};
use crate::storage::constraints::{
    CANDIDATE_IDENTITY, POSITION_MAX_SELECTIONS, POSITION_TITLE,
};
use crate::storage::StorageError;

pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("Election {0} does not exist")]
    ElectionNotFound(ElectionId),

    #[error("Position {0} does not exist")]
    PositionNotFound(PositionId),

    #[error("Candidate {0} does not exist")]
    CandidateNotFound(CandidateId),

    #[error("Voting window must end after it starts ({start} .. {end})")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("max_selections must be at least 1")]
    InvalidMaxSelections,

    #[error("An election cannot be created in phase {0}")]
    InvalidInitialPhase(ElectionPhase),

    #[error("Cannot move election from {from} to {to}")]
    InvalidTransition {
        from: ElectionPhase,
        to: ElectionPhase,
    },

    #[error("Election {election_id} is {phase}; positions and candidates are fixed")]
    StructureLocked {
        election_id: ElectionId,
        phase: ElectionPhase,
    },

    #[error("Election {election_id} is {phase}; the voting window is fixed")]
    WindowLocked {
        election_id: ElectionId,
        phase: ElectionPhase,
    },

    #[error("Election {0} is closed and can no longer change")]
    ElectionFinal(ElectionId),

    #[error("Election {0} is active and cannot be deleted")]
    DeleteWhileActive(ElectionId),

    #[error("Duplicate position title in election: {0}")]
    DuplicatePositionTitle(String),

    #[error("Duplicate candidate for position: {0}")]
    DuplicateCandidate(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl ClassifiedError for LifecycleError {
    fn category(&self) -> ErrorCategory {
        match self {
            LifecycleError::ElectionNotFound(_)
            | LifecycleError::PositionNotFound(_)
            | LifecycleError::CandidateNotFound(_)
            | LifecycleError::InvalidWindow { .. }
            | LifecycleError::EmptyField(_)
            | LifecycleError::InvalidMaxSelections
            | LifecycleError::InvalidInitialPhase(_) => ErrorCategory::Validation,
            LifecycleError::InvalidTransition { .. }
            | LifecycleError::StructureLocked { .. }
            | LifecycleError::WindowLocked { .. }
            | LifecycleError::ElectionFinal(_)
            | LifecycleError::DeleteWhileActive(_) => ErrorCategory::State,
            LifecycleError::DuplicatePositionTitle(_) | LifecycleError::DuplicateCandidate(_) => {
                ErrorCategory::Conflict
            }
            LifecycleError::Storage(_) => ErrorCategory::Storage,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            LifecycleError::ElectionNotFound(_) => "BALLOT_ELECTION_NOT_FOUND",
            LifecycleError::PositionNotFound(_) => "BALLOT_POSITION_NOT_FOUND",
            LifecycleError::CandidateNotFound(_) => "BALLOT_CANDIDATE_NOT_FOUND",
            LifecycleError::InvalidWindow { .. } => "BALLOT_INVALID_WINDOW",
            LifecycleError::EmptyField(_) => "BALLOT_EMPTY_FIELD",
            LifecycleError::InvalidMaxSelections => "BALLOT_INVALID_MAX_SELECTIONS",
            LifecycleError::InvalidInitialPhase(_) => "BALLOT_INVALID_INITIAL_PHASE",
            LifecycleError::InvalidTransition { .. } => "BALLOT_INVALID_TRANSITION",
            LifecycleError::StructureLocked { .. } => "BALLOT_STRUCTURE_LOCKED",
            LifecycleError::WindowLocked { .. } => "BALLOT_WINDOW_LOCKED",
            LifecycleError::ElectionFinal(_) => "BALLOT_ELECTION_FINAL",
            LifecycleError::DeleteWhileActive(_) => "BALLOT_DELETE_WHILE_ACTIVE",
            LifecycleError::DuplicatePositionTitle(_) => "BALLOT_DUPLICATE_POSITION",
            LifecycleError::DuplicateCandidate(_) => "BALLOT_DUPLICATE_CANDIDATE",
            LifecycleError::Storage(_) => "BALLOT_STORAGE_FAILURE",
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, LifecycleError::Storage(_))
    }
}

impl From<StorageError> for LifecycleError {
    fn from(err: StorageError) -> Self {
        let detail = err
            .violation()
            .map(|v| v.detail.clone())
            .unwrap_or_default();
        match err.constraint_name() {
            Some(POSITION_TITLE) => LifecycleError::DuplicatePositionTitle(detail),
            Some(CANDIDATE_IDENTITY) => LifecycleError::DuplicateCandidate(detail),
            Some(POSITION_MAX_SELECTIONS) => LifecycleError::InvalidMaxSelections,
            _ => LifecycleError::Storage(err.to_string()),
        }
    }
}
