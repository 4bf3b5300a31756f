//! Ledger errors

use thiserror::Error;

use crate::error::{ClassifiedError, ErrorCategory};
use crate::schema::{CandidateId, ElectionId, ElectionPhase, PositionId, VoterId};
use crate::storage::constraints::{
    PARTICIPATION_VERIFICATION_CODE, PARTICIPATION_VOTER_ELECTION, VOTE_COMMITMENT_HASH,
};
use crate::storage::StorageError;

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Why a ballot was not recorded. In every case nothing was written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ==================
    // Validation
    // ==================
    /// The id names no election. A malformed request, like an unknown
    /// position; an election that exists but is not open is
    /// `ElectionClosed`, a state error.
    #[error("Election {0} does not exist")]
    ElectionNotFound(ElectionId),

    #[error("Position {0} is not part of this election")]
    InvalidPosition(PositionId),

    #[error("Position {position_id} allows {max} selection(s), {selected} given")]
    TooManySelections {
        position_id: PositionId,
        selected: usize,
        max: u32,
    },

    #[error("Candidate {candidate_id} does not stand for position {position_id}")]
    UnknownCandidate {
        position_id: PositionId,
        candidate_id: CandidateId,
    },

    #[error("Ballot selects no candidates")]
    EmptyBallot,

    // ==================
    // State
    // ==================
    #[error("Election {election_id} is not accepting ballots (phase {phase})")]
    ElectionClosed {
        election_id: ElectionId,
        phase: ElectionPhase,
    },

    #[error("Voter {0} is not eligible to vote")]
    VoterIneligible(VoterId),

    // ==================
    // Conflict
    // ==================
    #[error("Voter has already cast a ballot in this election")]
    DuplicateParticipation,

    #[error("Transient storage conflict on {constraint}; retry the ballot")]
    StorageConflict { constraint: &'static str },

    // ==================
    // Storage
    // ==================
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl ClassifiedError for LedgerError {
    fn category(&self) -> ErrorCategory {
        match self {
            LedgerError::ElectionNotFound(_)
            | LedgerError::InvalidPosition(_)
            | LedgerError::TooManySelections { .. }
            | LedgerError::UnknownCandidate { .. }
            | LedgerError::EmptyBallot => ErrorCategory::Validation,
            LedgerError::ElectionClosed { .. } | LedgerError::VoterIneligible(_) => {
                ErrorCategory::State
            }
            LedgerError::DuplicateParticipation | LedgerError::StorageConflict { .. } => {
                ErrorCategory::Conflict
            }
            LedgerError::Storage(_) => ErrorCategory::Storage,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            LedgerError::ElectionNotFound(_) => "BALLOT_ELECTION_NOT_FOUND",
            LedgerError::InvalidPosition(_) => "BALLOT_INVALID_POSITION",
            LedgerError::TooManySelections { .. } => "BALLOT_TOO_MANY_SELECTIONS",
            LedgerError::UnknownCandidate { .. } => "BALLOT_UNKNOWN_CANDIDATE",
            LedgerError::EmptyBallot => "BALLOT_EMPTY",
            LedgerError::ElectionClosed { .. } => "BALLOT_ELECTION_CLOSED",
            LedgerError::VoterIneligible(_) => "BALLOT_VOTER_INELIGIBLE",
            LedgerError::DuplicateParticipation => "BALLOT_DUPLICATE_PARTICIPATION",
            LedgerError::StorageConflict { .. } => "BALLOT_STORAGE_CONFLICT",
            LedgerError::Storage(_) => "BALLOT_STORAGE_FAILURE",
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::StorageConflict { .. } | LedgerError::Storage(_)
        )
    }
}

impl From<StorageError> for LedgerError {
    fn from(err: StorageError) -> Self {
        match err.constraint_name() {
            Some(PARTICIPATION_VOTER_ELECTION) => LedgerError::DuplicateParticipation,
            Some(name @ (VOTE_COMMITMENT_HASH | PARTICIPATION_VERIFICATION_CODE)) => {
                LedgerError::StorageConflict { constraint: name }
            }
            _ => LedgerError::Storage(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ConstraintViolation;

    #[test]
    fn test_categories() {
        assert_eq!(LedgerError::EmptyBallot.category(), ErrorCategory::Validation);
        assert_eq!(LedgerError::DuplicateParticipation.category(), ErrorCategory::Conflict);
        assert_eq!(
            LedgerError::ElectionClosed {
                election_id: ElectionId::new(),
                phase: ElectionPhase::Closed
            }
            .category(),
            ErrorCategory::State
        );
    }

    #[test]
    fn test_unknown_election_is_told_apart_from_closed_one() {
        let id = ElectionId::new();
        let missing = LedgerError::ElectionNotFound(id);
        let closed = LedgerError::ElectionClosed {
            election_id: id,
            phase: ElectionPhase::Active,
        };
        assert_eq!(missing.category(), ErrorCategory::Validation);
        assert_eq!(closed.category(), ErrorCategory::State);
        assert_ne!(missing.code(), closed.code());
        assert!(!missing.is_retryable());
        assert!(!closed.is_retryable());
    }

    #[test]
    fn test_only_transient_failures_retry() {
        assert!(!LedgerError::DuplicateParticipation.is_retryable());
        assert!(!LedgerError::EmptyBallot.is_retryable());
        assert!(LedgerError::StorageConflict {
            constraint: VOTE_COMMITMENT_HASH
        }
        .is_retryable());
    }

    #[test]
    fn test_constraint_mapping() {
        let dup = StorageError::constraint(ConstraintViolation::unique(
            PARTICIPATION_VOTER_ELECTION,
            "taken",
        ));
        assert_eq!(LedgerError::from(dup), LedgerError::DuplicateParticipation);

        let hash = StorageError::constraint(ConstraintViolation::unique(VOTE_COMMITMENT_HASH, "taken"));
        assert!(matches!(
            LedgerError::from(hash),
            LedgerError::StorageConflict { constraint } if constraint == VOTE_COMMITMENT_HASH
        ));

        let halted = LedgerError::from(StorageError::halted());
        assert_eq!(halted.code(), "BALLOT_STORAGE_FAILURE");
    }
}
