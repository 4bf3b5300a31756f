//! Row types for the ballot store
//!
//! Ownership: Election owns Positions, Position owns Candidates, Candidate
//! owns Votes. ParticipationRecord links a voter to an election and is the
//! only place a voter identity is stored next to an election.
//!
//! Vote rows carry no voter reference. That is the anonymity boundary and
//! is checked against the serialized row in the tests.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{
    CandidateId, CandidateIdentity, ElectionId, ParticipationId, PositionId, VoteId, VoterId,
};
use super::values::{CommitmentHash, VerificationCode};

/// Election lifecycle phase.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionPhase {
    /// Being prepared; positions and candidates may change.
    Draft,
    /// Announced; positions and candidates may still change.
    Scheduled,
    /// Accepting ballots inside the time window.
    Active,
    /// Terminal. No further ballots or transitions.
    Closed,
}

impl ElectionPhase {
    /// Returns the phase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElectionPhase::Draft => "draft",
            ElectionPhase::Scheduled => "scheduled",
            ElectionPhase::Active => "active",
            ElectionPhase::Closed => "closed",
        }
    }

    /// Whether the ballot structure (positions, candidates) may change.
    pub fn allows_ballot_edits(&self) -> bool {
        matches!(self, ElectionPhase::Draft | ElectionPhase::Scheduled)
    }
}

impl fmt::Display for ElectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElectionPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "draft" => Ok(ElectionPhase::Draft),
            "scheduled" => Ok(ElectionPhase::Scheduled),
            "active" => Ok(ElectionPhase::Active),
            "closed" => Ok(ElectionPhase::Closed),
            other => Err(format!("unknown election phase '{}'", other)),
        }
    }
}

/// An election and its voting window `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Election {
    pub id: ElectionId,
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub phase: ElectionPhase,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Election {
    /// Returns true if `now` falls inside `[start, end)`.
    pub fn window_contains(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now < self.end
    }

    /// Returns true if the election accepts ballots at `now`.
    pub fn accepts_ballots_at(&self, now: DateTime<Utc>) -> bool {
        self.phase == ElectionPhase::Active && self.window_contains(now)
    }

    /// Returns true if the window is well formed.
    pub fn has_valid_window(&self) -> bool {
        self.end > self.start
    }
}

/// A contested office within one election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub election_id: ElectionId,
    pub title: String,
    pub description: String,
    pub display_order: i32,
    pub max_selections: u32,
}

/// A person standing for one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub position_id: PositionId,
    pub identity: CandidateIdentity,
    pub full_name: String,
    pub department: String,
    pub level: String,
    pub manifesto: String,
    pub created_at: DateTime<Utc>,
}

/// One cast selection. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub candidate_id: CandidateId,
    pub commitment_hash: CommitmentHash,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_hint: Option<IpAddr>,
}

/// Proof that a voter took part in an election, without what they chose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipationRecord {
    pub id: ParticipationId,
    pub voter_id: VoterId,
    pub election_id: ElectionId,
    pub voted_at: DateTime<Utc>,
    pub verification_code: VerificationCode,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn election(phase: ElectionPhase) -> Election {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        Election {
            id: ElectionId::new(),
            title: "Student Union".to_string(),
            description: String::new(),
            start,
            end: start + Duration::hours(1),
            phase,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn test_window_is_half_open() {
        let e = election(ElectionPhase::Active);
        assert!(e.window_contains(e.start));
        assert!(e.window_contains(e.end - Duration::seconds(1)));
        assert!(!e.window_contains(e.end));
        assert!(!e.window_contains(e.start - Duration::seconds(1)));
    }

    #[test]
    fn test_only_active_accepts_ballots() {
        for phase in [ElectionPhase::Draft, ElectionPhase::Scheduled, ElectionPhase::Closed] {
            let e = election(phase);
            assert!(!e.accepts_ballots_at(e.start));
        }
        let e = election(ElectionPhase::Active);
        assert!(e.accepts_ballots_at(e.start));
    }

    #[test]
    fn test_phase_parse() {
        assert_eq!("Active".parse::<ElectionPhase>().unwrap(), ElectionPhase::Active);
        assert!("open".parse::<ElectionPhase>().is_err());
    }

    #[test]
    fn test_serialized_vote_has_no_voter_column() {
        // Every field is set so no column is skipped in the output.
        let vote = Vote {
            id: VoteId::new(),
            candidate_id: CandidateId::new(),
            commitment_hash: CommitmentHash::from_bytes([1; 32]),
            created_at: Utc::now(),
            origin_hint: Some("10.0.0.1".parse().unwrap()),
        };
        let value = serde_json::to_value(&vote).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        keys.sort();
        assert_eq!(
            keys,
            ["candidate_id", "commitment_hash", "created_at", "id", "origin_hint"]
        );
        assert!(keys.iter().all(|k| !k.contains("voter") && !k.contains("user")));
    }
}
