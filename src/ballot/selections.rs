//! A voter's choices, keyed by position

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::schema::{CandidateId, PositionId};

/// Selected candidates per position.
///
/// Sets make a candidate selected twice for one position count once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BallotSelections(BTreeMap<PositionId, BTreeSet<CandidateId>>);

impl BallotSelections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one selection.
    pub fn select(&mut self, position_id: PositionId, candidate_id: CandidateId) -> &mut Self {
        self.0.entry(position_id).or_default().insert(candidate_id);
        self
    }

    /// Builder form of `select`.
    pub fn with(mut self, position_id: PositionId, candidate_id: CandidateId) -> Self {
        self.select(position_id, candidate_id);
        self
    }

    /// Number of (position, candidate) pairs.
    pub fn total_selections(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }

    /// True if no candidate is selected anywhere.
    pub fn is_empty(&self) -> bool {
        self.total_selections() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PositionId, &BTreeSet<CandidateId>)> {
        self.0.iter()
    }

    pub fn positions(&self) -> impl Iterator<Item = &PositionId> {
        self.0.keys()
    }
}

impl From<BTreeMap<PositionId, BTreeSet<CandidateId>>> for BallotSelections {
    fn from(map: BTreeMap<PositionId, BTreeSet<CandidateId>>) -> Self {
        Self(map)
    }
}
