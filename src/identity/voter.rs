//! Voter profiles as seen through the identity provider

use serde::{Deserialize, Serialize};

use crate::schema::VoterId;

/// Account class. Only `Voter` accounts may cast ballots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoterRole {
    Voter,
    Administrator,
}

/// What the engine needs to know about a voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterProfile {
    pub voter_id: VoterId,
    pub role: VoterRole,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl VoterProfile {
    /// An active voter-class profile.
    pub fn voter(voter_id: VoterId) -> Self {
        Self {
            voter_id,
            role: VoterRole::Voter,
            active: true,
        }
    }

    /// Voter-class and not deactivated.
    pub fn may_vote(&self) -> bool {
        self.role == VoterRole::Voter && self.active
    }
}
