//! Eligibility gate
//!
//! Answers whether a voter may cast a ballot in an election right now.
//! The answer is advisory: the ledger re-checks election state inside its
//! transaction and the store's participation constraint is what actually
//! prevents a second ballot.
//!
//! Checks run in a fixed order against one snapshot:
//! election exists, voter eligible, election accepting ballots, voter has
//! not yet participated.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::identity::IdentityProvider;
use crate::schema::{ElectionId, VoterId};
use crate::storage::Snapshot;

/// Outcome of an eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EligibilityStatus {
    Allowed,
    AlreadyVoted,
    ElectionNotActive,
    ElectionNotFound,
    VoterIneligible,
}

impl EligibilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EligibilityStatus::Allowed => "ALLOWED",
            EligibilityStatus::AlreadyVoted => "ALREADY_VOTED",
            EligibilityStatus::ElectionNotActive => "ELECTION_NOT_ACTIVE",
            EligibilityStatus::ElectionNotFound => "ELECTION_NOT_FOUND",
            EligibilityStatus::VoterIneligible => "VOTER_INELIGIBLE",
        }
    }

    pub fn is_allowed(&self) -> bool {
        *self == EligibilityStatus::Allowed
    }
}

impl fmt::Display for EligibilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evaluates eligibility of `voter_id` for `election_id` at `now`.
pub fn can_vote(
    snapshot: &Snapshot<'_>,
    identity: &dyn IdentityProvider,
    voter_id: &VoterId,
    election_id: &ElectionId,
    now: DateTime<Utc>,
) -> EligibilityStatus {
    let election = match snapshot.election(election_id) {
        Some(election) => election,
        None => return EligibilityStatus::ElectionNotFound,
    };

    match identity.get_voter(voter_id) {
        Some(profile) if profile.may_vote() => {}
        _ => return EligibilityStatus::VoterIneligible,
    }

    if !election.accepts_ballots_at(now) {
        return EligibilityStatus::ElectionNotActive;
    }

    if snapshot.has_participated(voter_id, election_id) {
        return EligibilityStatus::AlreadyVoted;
    }

    EligibilityStatus::Allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{InMemoryIdentityProvider, VoterProfile, VoterRole};
    use crate::schema::{
        Election, ElectionPhase, ParticipationId, ParticipationRecord, VerificationCode,
    };
    use crate::storage::{Mutation, StorageError, Store};
    use chrono::{Duration, TimeZone};

    fn nine() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn seeded(phase: ElectionPhase) -> (Store, ElectionId) {
        let store = Store::in_memory();
        let election = Election {
            id: ElectionId::new(),
            title: "Senate".to_string(),
            description: String::new(),
            start: nine(),
            end: nine() + Duration::hours(1),
            phase,
            created_at: nine(),
            updated_at: nine(),
        };
        let id = election.id;
        store
            .transact(|txn| {
                txn.stage(Mutation::PutElection(election));
                Ok::<_, StorageError>(())
            })
            .unwrap();
        (store, id)
    }

    #[test]
    fn test_unknown_election_checked_first() {
        let store = Store::in_memory();
        let identity = InMemoryIdentityProvider::new();
        let status = can_vote(&store.snapshot(), &identity, &VoterId::new(), &ElectionId::new(), nine());
        assert_eq!(status, EligibilityStatus::ElectionNotFound);
    }

    #[test]
    fn test_ineligible_before_not_active() {
        let (store, id) = seeded(ElectionPhase::Draft);
        let identity = InMemoryIdentityProvider::new();
        let admin = VoterId::new();
        identity.upsert(VoterProfile {
            voter_id: admin,
            role: VoterRole::Administrator,
            active: true,
        });

        let snapshot = store.snapshot();
        assert_eq!(
            can_vote(&snapshot, &identity, &admin, &id, nine()),
            EligibilityStatus::VoterIneligible
        );
        assert_eq!(
            can_vote(&snapshot, &identity, &VoterId::new(), &id, nine()),
            EligibilityStatus::VoterIneligible
        );
    }

    #[test]
    fn test_window_and_phase() {
        let identity = InMemoryIdentityProvider::new();
        let voter = identity.register_voter();

        let (store, id) = seeded(ElectionPhase::Scheduled);
        assert_eq!(
            can_vote(&store.snapshot(), &identity, &voter, &id, nine()),
            EligibilityStatus::ElectionNotActive
        );

        let (store, id) = seeded(ElectionPhase::Active);
        let snapshot = store.snapshot();
        assert_eq!(
            can_vote(&snapshot, &identity, &voter, &id, nine() + Duration::minutes(30)),
            EligibilityStatus::Allowed
        );
        assert_eq!(
            can_vote(&snapshot, &identity, &voter, &id, nine() + Duration::hours(1)),
            EligibilityStatus::ElectionNotActive
        );
    }

    #[test]
    fn test_already_voted() {
        let identity = InMemoryIdentityProvider::new();
        let voter = identity.register_voter();
        let (store, id) = seeded(ElectionPhase::Active);
        store
            .transact(|txn| {
                txn.stage(Mutation::InsertParticipation(ParticipationRecord {
                    id: ParticipationId::new(),
                    voter_id: voter,
                    election_id: id,
                    voted_at: nine(),
                    verification_code: VerificationCode::from_bytes(&[9; 16]),
                }));
                Ok::<_, StorageError>(())
            })
            .unwrap();

        assert_eq!(
            can_vote(&store.snapshot(), &identity, &voter, &id, nine()),
            EligibilityStatus::AlreadyVoted
        );
    }
}
