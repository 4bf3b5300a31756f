//! Staged mutations
//!
//! A committed transaction is a batch of mutations. The batch is the WAL
//! payload (a JSON array) and is applied to the tables in order.

use serde::{Deserialize, Serialize};

use crate::schema::{
    Candidate, CandidateId, Election, ElectionId, ParticipationRecord, Position, PositionId, Vote,
    VoterId,
};

/// One row-level change inside a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// Insert a new election or write a new version of a live one.
    PutElection(Election),
    InsertPosition(Position),
    InsertCandidate(Candidate),
    InsertVote(Vote),
    InsertParticipation(ParticipationRecord),
    /// Tombstones the election and everything it owns.
    DeleteElection { id: ElectionId },
    /// Tombstones the position, its candidates and their votes.
    DeletePosition { id: PositionId },
    /// Tombstones the candidate and its votes.
    DeleteCandidate { id: CandidateId },
    /// Tombstones every participation record of the voter.
    PurgeVoter { voter_id: VoterId },
}

impl Mutation {
    /// Short name used in logs.
    pub fn op_name(&self) -> &'static str {
        match self {
            Mutation::PutElection(_) => "put_election",
            Mutation::InsertPosition(_) => "insert_position",
            Mutation::InsertCandidate(_) => "insert_candidate",
            Mutation::InsertVote(_) => "insert_vote",
            Mutation::InsertParticipation(_) => "insert_participation",
            Mutation::DeleteElection { .. } => "delete_election",
            Mutation::DeletePosition { .. } => "delete_position",
            Mutation::DeleteCandidate { .. } => "delete_candidate",
            Mutation::PurgeVoter { .. } => "purge_voter",
        }
    }
}

/// Encodes a batch as a WAL payload.
pub fn encode_batch(batch: &[Mutation]) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(batch)
}

/// Decodes a WAL payload.
pub fn decode_batch(payload: &[u8]) -> serde_json::Result<Vec<Mutation>> {
    serde_json::from_slice(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_is_tagged() {
        let id = ElectionId::new();
        let json = serde_json::to_value(Mutation::DeleteElection { id }).unwrap();
        assert_eq!(json["op"], "delete_election");
        assert_eq!(json["id"], id.to_string());
    }

    #[test]
    fn test_batch_decodes_what_it_encodes() {
        let batch = vec![
            Mutation::PurgeVoter {
                voter_id: VoterId::new(),
            },
            Mutation::DeleteCandidate {
                id: CandidateId::new(),
            },
        ];
        let bytes = encode_batch(&batch).unwrap();
        assert_eq!(decode_batch(&bytes).unwrap(), batch);
    }

    #[test]
    fn test_garbage_payload_fails() {
        assert!(decode_batch(b"{not json").is_err());
    }
}
