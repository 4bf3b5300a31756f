//! Administrative operations on elections and their ballot structure
//!
//! Each operation is one store transaction. Phase guards are evaluated
//! inside it, so an operation and a concurrent transition or ballot are
//! always ordered one way or the other.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Clock;
use crate::schema::{
    Candidate, CandidateId, CandidateIdentity, Election, ElectionId, ElectionPhase, Position,
    PositionId, VoterId,
};
use crate::storage::{Mutation, Store, Transaction};

use super::errors::{LifecycleError, LifecycleResult};
use super::phase;

/// Request to create an election.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewElection {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default = "default_initial_phase")]
    pub phase: ElectionPhase,
}

fn default_initial_phase() -> ElectionPhase {
    ElectionPhase::Draft
}

/// Partial update of an election. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElectionUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

impl ElectionUpdate {
    fn touches_window(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }
}

/// Request to add a position to an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPosition {
    pub election_id: ElectionId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_max_selections")]
    pub max_selections: u32,
}

fn default_max_selections() -> u32 {
    1
}

/// Request to add a candidate to a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCandidate {
    pub position_id: PositionId,
    /// Stable identity of the person standing. Generated when omitted.
    #[serde(default)]
    pub identity: CandidateIdentity,
    pub full_name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub manifesto: String,
}

/// Result of a phase transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseChange {
    pub from: ElectionPhase,
    pub election: Election,
}

/// Administrative operations over one store.
pub struct ElectionAdmin {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
}

impl ElectionAdmin {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn create_election(&self, request: NewElection) -> LifecycleResult<Election> {
        let title = non_empty("title", request.title)?;
        let now = self.clock.now();

        let mut election = Election {
            id: ElectionId::new(),
            title,
            description: request.description,
            start: request.start,
            end: request.end,
            phase: request.phase,
            created_at: now,
            updated_at: now,
        };

        match election.phase {
            ElectionPhase::Draft | ElectionPhase::Scheduled => check_window(&election)?,
            ElectionPhase::Active => phase::clamp_start(&mut election, now)?,
            ElectionPhase::Closed => {
                return Err(LifecycleError::InvalidInitialPhase(ElectionPhase::Closed))
            }
        }

        self.store.transact(|txn| {
            txn.stage(Mutation::PutElection(election.clone()));
            Ok::<_, LifecycleError>(())
        })?;
        Ok(election)
    }

    pub fn update_election(
        &self,
        election_id: &ElectionId,
        update: ElectionUpdate,
    ) -> LifecycleResult<Election> {
        let title = update.title.clone().map(|t| non_empty("title", t)).transpose()?;

        self.store.transact(|txn| {
            let current = existing_election(txn, election_id)?;
            if current.phase == ElectionPhase::Closed {
                return Err(LifecycleError::ElectionFinal(*election_id));
            }
            if update.touches_window() && !current.phase.allows_ballot_edits() {
                return Err(LifecycleError::WindowLocked {
                    election_id: *election_id,
                    phase: current.phase,
                });
            }

            let mut next = current.clone();
            if let Some(title) = title {
                next.title = title;
            }
            if let Some(description) = update.description {
                next.description = description;
            }
            if let Some(start) = update.start {
                next.start = start;
            }
            if let Some(end) = update.end {
                next.end = end;
            }
            check_window(&next)?;
            next.updated_at = self.clock.now();

            txn.stage(Mutation::PutElection(next.clone()));
            Ok(next)
        })
    }

    /// Deletes an election with everything it owns.
    pub fn delete_election(&self, election_id: &ElectionId) -> LifecycleResult<Election> {
        self.store.transact(|txn| {
            let current = existing_election(txn, election_id)?;
            if current.phase == ElectionPhase::Active {
                return Err(LifecycleError::DeleteWhileActive(*election_id));
            }
            txn.stage(Mutation::DeleteElection { id: *election_id });
            Ok(current.clone())
        })
    }

    /// Moves an election to `to`, clamping the start when activating.
    pub fn transition(
        &self,
        election_id: &ElectionId,
        to: ElectionPhase,
    ) -> LifecycleResult<PhaseChange> {
        self.store.transact(|txn| {
            let current = existing_election(txn, election_id)?;
            let next = phase::transition(current, to, self.clock.now())?;
            txn.stage(Mutation::PutElection(next.clone()));
            Ok(PhaseChange {
                from: current.phase,
                election: next,
            })
        })
    }

    pub fn add_position(&self, request: NewPosition) -> LifecycleResult<Position> {
        let title = non_empty("title", request.title)?;
        if request.max_selections == 0 {
            return Err(LifecycleError::InvalidMaxSelections);
        }

        self.store.transact(|txn| {
            let election = existing_election(txn, &request.election_id)?;
            ensure_structure_editable(election)?;
            if txn
                .positions_of(&election.id)
                .iter()
                .any(|p| p.title == title)
            {
                return Err(LifecycleError::DuplicatePositionTitle(title));
            }

            let position = Position {
                id: PositionId::new(),
                election_id: election.id,
                title,
                description: request.description,
                display_order: request.display_order,
                max_selections: request.max_selections,
            };
            txn.stage(Mutation::InsertPosition(position.clone()));
            Ok(position)
        })
    }

    /// Removes a position, its candidates and their votes.
    pub fn remove_position(&self, position_id: &PositionId) -> LifecycleResult<Position> {
        self.store.transact(|txn| {
            let position = txn
                .position(position_id)
                .ok_or(LifecycleError::PositionNotFound(*position_id))?;
            ensure_structure_editable(existing_election(txn, &position.election_id)?)?;
            txn.stage(Mutation::DeletePosition { id: *position_id });
            Ok(position.clone())
        })
    }

    pub fn add_candidate(&self, request: NewCandidate) -> LifecycleResult<Candidate> {
        let full_name = non_empty("full_name", request.full_name)?;

        self.store.transact(|txn| {
            let position = txn
                .position(&request.position_id)
                .ok_or(LifecycleError::PositionNotFound(request.position_id))?;
            ensure_structure_editable(existing_election(txn, &position.election_id)?)?;
            if txn
                .candidates_of(&position.id)
                .iter()
                .any(|c| c.identity == request.identity)
            {
                return Err(LifecycleError::DuplicateCandidate(request.identity.to_string()));
            }

            let candidate = Candidate {
                id: CandidateId::new(),
                position_id: position.id,
                identity: request.identity,
                full_name,
                department: request.department,
                level: request.level,
                manifesto: request.manifesto,
                created_at: self.clock.now(),
            };
            txn.stage(Mutation::InsertCandidate(candidate.clone()));
            Ok(candidate)
        })
    }

    /// Removes a candidate and its votes.
    pub fn remove_candidate(&self, candidate_id: &CandidateId) -> LifecycleResult<Candidate> {
        self.store.transact(|txn| {
            let candidate = txn
                .candidate(candidate_id)
                .ok_or(LifecycleError::CandidateNotFound(*candidate_id))?;
            let position = txn
                .position(&candidate.position_id)
                .ok_or(LifecycleError::PositionNotFound(candidate.position_id))?;
            ensure_structure_editable(existing_election(txn, &position.election_id)?)?;
            txn.stage(Mutation::DeleteCandidate { id: *candidate_id });
            Ok(candidate.clone())
        })
    }

    /// Elections, newest first.
    pub fn list_elections(&self) -> Vec<Election> {
        let mut elections = self.store.snapshot().elections();
        elections.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        elections
    }

    /// Removes every participation record of a departing voter.
    ///
    /// Vote rows are untouched; they carry no voter reference. The voter
    /// still counts as having voted in those elections, so a later ballot
    /// is rejected. Returns the number of records removed.
    pub fn purge_voter(&self, voter_id: &VoterId) -> LifecycleResult<usize> {
        self.store.transact(|txn| {
            let removed = txn.participation_of_voter(voter_id).len();
            if removed > 0 {
                txn.stage(Mutation::PurgeVoter {
                    voter_id: *voter_id,
                });
            }
            Ok(removed)
        })
    }
}

fn existing_election<'a>(
    txn: &Transaction<'a>,
    election_id: &ElectionId,
) -> LifecycleResult<&'a Election> {
    txn.election(election_id)
        .ok_or(LifecycleError::ElectionNotFound(*election_id))
}

fn ensure_structure_editable(election: &Election) -> LifecycleResult<()> {
    if election.phase.allows_ballot_edits() {
        Ok(())
    } else {
        Err(LifecycleError::StructureLocked {
            election_id: election.id,
            phase: election.phase,
        })
    }
}

fn check_window(election: &Election) -> LifecycleResult<()> {
    if election.has_valid_window() {
        Ok(())
    } else {
        Err(LifecycleError::InvalidWindow {
            start: election.start,
            end: election.end,
        })
    }
}

fn non_empty(field: &'static str, value: String) -> LifecycleResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(LifecycleError::EmptyField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ManualClock;
    use chrono::{Duration, TimeZone};

    fn nine() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn admin() -> (Arc<Store>, Arc<ManualClock>, ElectionAdmin) {
        let store = Arc::new(Store::in_memory());
        let clock = Arc::new(ManualClock::new(nine()));
        let admin = ElectionAdmin::new(store.clone(), clock.clone());
        (store, clock, admin)
    }

    fn draft(admin: &ElectionAdmin) -> Election {
        admin
            .create_election(NewElection {
                title: "Student Union".to_string(),
                description: String::new(),
                start: nine() + Duration::hours(1),
                end: nine() + Duration::hours(2),
                phase: ElectionPhase::Draft,
            })
            .unwrap()
    }

    fn position(admin: &ElectionAdmin, election_id: ElectionId, title: &str) -> LifecycleResult<Position> {
        admin.add_position(NewPosition {
            election_id,
            title: title.to_string(),
            description: String::new(),
            display_order: 0,
            max_selections: 1,
        })
    }

    fn candidate(admin: &ElectionAdmin, position_id: PositionId, name: &str) -> LifecycleResult<Candidate> {
        admin.add_candidate(NewCandidate {
            position_id,
            identity: CandidateIdentity::new(),
            full_name: name.to_string(),
            department: String::new(),
            level: String::new(),
            manifesto: String::new(),
        })
    }

    #[test]
    fn test_create_rejects_bad_window() {
        let (_, _, admin) = admin();
        let err = admin
            .create_election(NewElection {
                title: "X".to_string(),
                description: String::new(),
                start: nine(),
                end: nine(),
                phase: ElectionPhase::Draft,
            })
            .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidWindow { .. }));
    }

    #[test]
    fn test_create_active_clamps_start() {
        let (_, _, admin) = admin();
        let election = admin
            .create_election(NewElection {
                title: "Snap poll".to_string(),
                description: String::new(),
                start: nine() + Duration::hours(1),
                end: nine() + Duration::hours(2),
                phase: ElectionPhase::Active,
            })
            .unwrap();
        assert_eq!(election.start, nine());
        assert_eq!(election.phase, ElectionPhase::Active);
    }

    #[test]
    fn test_create_closed_rejected() {
        let (_, _, admin) = admin();
        let err = admin
            .create_election(NewElection {
                title: "X".to_string(),
                description: String::new(),
                start: nine(),
                end: nine() + Duration::hours(1),
                phase: ElectionPhase::Closed,
            })
            .unwrap_err();
        assert_eq!(err, LifecycleError::InvalidInitialPhase(ElectionPhase::Closed));
    }

    #[test]
    fn test_structure_locked_once_active() {
        let (_, _, admin) = admin();
        let election = draft(&admin);
        let president = position(&admin, election.id, "President").unwrap();
        candidate(&admin, president.id, "Ada").unwrap();

        admin.transition(&election.id, ElectionPhase::Active).unwrap();

        assert!(matches!(
            position(&admin, election.id, "Treasurer"),
            Err(LifecycleError::StructureLocked { phase: ElectionPhase::Active, .. })
        ));
        assert!(matches!(
            candidate(&admin, president.id, "Brook"),
            Err(LifecycleError::StructureLocked { .. })
        ));
        assert!(matches!(
            admin.remove_position(&president.id),
            Err(LifecycleError::StructureLocked { .. })
        ));
    }

    #[test]
    fn test_duplicate_structure_rejected() {
        let (_, _, admin) = admin();
        let election = draft(&admin);
        let president = position(&admin, election.id, "President").unwrap();
        assert!(matches!(
            position(&admin, election.id, "President"),
            Err(LifecycleError::DuplicatePositionTitle(_))
        ));

        let identity = CandidateIdentity::new();
        let request = NewCandidate {
            position_id: president.id,
            identity,
            full_name: "Ada".to_string(),
            department: String::new(),
            level: String::new(),
            manifesto: String::new(),
        };
        admin.add_candidate(request.clone()).unwrap();
        assert!(matches!(
            admin.add_candidate(request),
            Err(LifecycleError::DuplicateCandidate(_))
        ));
    }

    #[test]
    fn test_removed_title_can_be_reused() {
        let (_, _, admin) = admin();
        let election = draft(&admin);
        let first = position(&admin, election.id, "President").unwrap();
        admin.remove_position(&first.id).unwrap();
        position(&admin, election.id, "President").unwrap();
    }

    #[test]
    fn test_update_rules() {
        let (_, clock, admin) = admin();
        let election = draft(&admin);

        let updated = admin
            .update_election(
                &election.id,
                ElectionUpdate {
                    end: Some(nine() + Duration::hours(5)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.end, nine() + Duration::hours(5));

        admin.transition(&election.id, ElectionPhase::Active).unwrap();
        assert!(matches!(
            admin.update_election(
                &election.id,
                ElectionUpdate {
                    end: Some(nine() + Duration::hours(6)),
                    ..Default::default()
                }
            ),
            Err(LifecycleError::WindowLocked { .. })
        ));

        clock.advance(Duration::minutes(5));
        let renamed = admin
            .update_election(
                &election.id,
                ElectionUpdate {
                    title: Some("Student Union 2026".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(renamed.title, "Student Union 2026");
        assert_eq!(renamed.updated_at, nine() + Duration::minutes(5));

        admin.transition(&election.id, ElectionPhase::Closed).unwrap();
        assert_eq!(
            admin.update_election(&election.id, ElectionUpdate::default()),
            Err(LifecycleError::ElectionFinal(election.id))
        );
    }

    #[test]
    fn test_delete_rules() {
        let (store, _, admin) = admin();
        let election = draft(&admin);
        let president = position(&admin, election.id, "President").unwrap();

        admin.transition(&election.id, ElectionPhase::Active).unwrap();
        assert_eq!(
            admin.delete_election(&election.id),
            Err(LifecycleError::DeleteWhileActive(election.id))
        );

        admin.transition(&election.id, ElectionPhase::Closed).unwrap();
        admin.delete_election(&election.id).unwrap();
        let snapshot = store.snapshot();
        assert!(snapshot.election(&election.id).is_none());
        assert!(snapshot.position(&president.id).is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let (_, clock, admin) = admin();
        let older = draft(&admin);
        clock.advance(Duration::minutes(1));
        let newer = draft(&admin);

        let ids: Vec<_> = admin.list_elections().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[test]
    fn test_purge_unknown_voter_commits_nothing() {
        let (store, _, admin) = admin();
        let before = store.last_commit();
        assert_eq!(admin.purge_voter(&VoterId::new()).unwrap(), 0);
        assert_eq!(store.last_commit(), before);
    }
}
