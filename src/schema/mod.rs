//! Ballot store schema
//!
//! Row types, typed identifiers, and column value types shared by the
//! store, the ledger and the tally.

mod ids;
mod types;
mod values;

pub use ids::{
    CandidateId, CandidateIdentity, ElectionId, ParticipationId, PositionId, VoteId, VoterId,
};
pub use types::{Candidate, Election, ElectionPhase, ParticipationRecord, Position, Vote};
pub use values::{
    CommitmentHash, VerificationCode, COMMITMENT_HASH_LEN, VERIFICATION_CODE_BYTES,
};
