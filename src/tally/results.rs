use serde::Serialize;

use crate::mvcc::CommitId;
use crate::schema::{CandidateId, ElectionId, ElectionPhase, PositionId};

/// Tally of one election at one commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElectionTally {
    pub election_id: ElectionId,
    pub title: String,
    pub phase: ElectionPhase,
    /// Commit the tally reflects.
    pub as_of: CommitId,
    pub total_votes: u64,
    /// Participation records, one per voter who cast a ballot.
    pub ballots_cast: u64,
    pub positions: Vec<PositionTally>,
}

impl ElectionTally {
    pub fn position(&self, position_id: &PositionId) -> Option<&PositionTally> {
        self.positions.iter().find(|p| p.position_id == *position_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionTally {
    pub position_id: PositionId,
    pub title: String,
    pub max_selections: u32,
    pub total_votes: u64,
    /// Ranked: count descending, then name, then id.
    pub candidates: Vec<CandidateTally>,
}

impl PositionTally {
    /// The leading candidates. Empty when no votes were cast.
    pub fn leaders(&self) -> Vec<&CandidateTally> {
        let top = match self.candidates.first() {
            Some(first) if first.count > 0 => first.count,
            _ => return Vec::new(),
        };
        self.candidates.iter().filter(|c| c.count == top).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateTally {
    pub candidate_id: CandidateId,
    pub full_name: String,
    pub count: u64,
    pub percentage: f64,
}
