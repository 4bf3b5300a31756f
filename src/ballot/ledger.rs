//! Ballot ledger
//!
//! `cast_ballots` runs as one store transaction. Every check that decides
//! whether a ballot is admitted runs inside it, against head state, so no
//! other commit can slip between a check and the write:
//!
//! 1. the election exists, is active and `now` is inside its window
//! 2. every position belongs to the election and no position is over-selected
//! 3. every candidate stands for the position it is selected under
//! 4. at least one candidate is selected
//! 5. the voter has never participated in the election, purged records
//!    included
//!
//! Check 5 is a fast path. The store's `participation_voter_election`
//! constraint is what makes two concurrent ballots from one voter resolve
//! to exactly one commit.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::identity::Clock;
use crate::schema::{ElectionId, ParticipationId, ParticipationRecord, Vote, VoteId, VoterId};
use crate::schema::VerificationCode;
use crate::storage::{Mutation, Store};

use super::errors::{LedgerError, LedgerResult};
use super::hasher::BallotHasher;
use super::selections::BallotSelections;
use super::verification::{CodeSource, OsCodeSource};

/// What the voter gets back after a successful cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BallotReceipt {
    pub verification_code: VerificationCode,
    pub election_id: ElectionId,
    pub voted_at: DateTime<Utc>,
    pub votes_recorded: usize,
}

/// Answer to a participation lookup. Never says how the voter voted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipationProof {
    pub election_id: ElectionId,
    pub voted_at: DateTime<Utc>,
}

/// Writes ballots into the store.
pub struct BallotLedger {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    codes: Arc<dyn CodeSource>,
}

impl BallotLedger {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            codes: Arc::new(OsCodeSource),
        }
    }

    /// Replaces the verification code source.
    pub fn with_codes(mut self, codes: Arc<dyn CodeSource>) -> Self {
        self.codes = codes;
        self
    }

    /// Records one ballot atomically.
    ///
    /// On success one vote row exists per selected candidate and exactly
    /// one participation record exists for `(voter_id, election_id)`. On
    /// any error nothing was written.
    pub fn cast_ballots(
        &self,
        voter_id: &VoterId,
        election_id: &ElectionId,
        selections: &BallotSelections,
        origin: Option<IpAddr>,
    ) -> LedgerResult<BallotReceipt> {
        let origin_hint = origin.map(coarsen_origin);

        self.store.transact(|txn| {
            let now = self.clock.now();

            let election = txn
                .election(election_id)
                .ok_or(LedgerError::ElectionNotFound(*election_id))?;
            if !election.accepts_ballots_at(now) {
                return Err(LedgerError::ElectionClosed {
                    election_id: *election_id,
                    phase: election.phase,
                });
            }

            for (position_id, chosen) in selections.iter() {
                let position = txn
                    .position(position_id)
                    .filter(|p| p.election_id == *election_id)
                    .ok_or(LedgerError::InvalidPosition(*position_id))?;

                if chosen.len() > position.max_selections as usize {
                    return Err(LedgerError::TooManySelections {
                        position_id: *position_id,
                        selected: chosen.len(),
                        max: position.max_selections,
                    });
                }

                for candidate_id in chosen {
                    let stands = txn
                        .candidate(candidate_id)
                        .map_or(false, |c| c.position_id == *position_id);
                    if !stands {
                        return Err(LedgerError::UnknownCandidate {
                            position_id: *position_id,
                            candidate_id: *candidate_id,
                        });
                    }
                }
            }

            if selections.is_empty() {
                return Err(LedgerError::EmptyBallot);
            }

            if txn.has_participated(voter_id, election_id) {
                return Err(LedgerError::DuplicateParticipation);
            }

            let mut votes_recorded = 0;
            for (_, chosen) in selections.iter() {
                for candidate_id in chosen {
                    txn.stage(Mutation::InsertVote(Vote {
                        id: VoteId::new(),
                        candidate_id: *candidate_id,
                        commitment_hash: BallotHasher::commit_fresh(voter_id, candidate_id, now),
                        created_at: now,
                        origin_hint,
                    }));
                    votes_recorded += 1;
                }
            }

            let verification_code = self.codes.next_code();
            txn.stage(Mutation::InsertParticipation(ParticipationRecord {
                id: ParticipationId::new(),
                voter_id: *voter_id,
                election_id: *election_id,
                voted_at: now,
                verification_code: verification_code.clone(),
            }));

            Ok(BallotReceipt {
                verification_code,
                election_id: *election_id,
                voted_at: now,
                votes_recorded,
            })
        })
    }

    /// Looks up a participation record by its verification code.
    pub fn verify_participation(&self, code: &VerificationCode) -> Option<ParticipationProof> {
        self.store
            .snapshot()
            .participation_by_code(code)
            .map(|record| ParticipationProof {
                election_id: record.election_id,
                voted_at: record.voted_at,
            })
    }
}

/// Reduces an address to its network: IPv4 to /24, IPv6 to /48.
pub fn coarsen_origin(addr: IpAddr) -> IpAddr {
    match addr {
        IpAddr::V4(v4) => {
            let [a, b, c, _] = v4.octets();
            IpAddr::V4(Ipv4Addr::new(a, b, c, 0))
        }
        IpAddr::V6(v6) => {
            let s = v6.segments();
            IpAddr::V6(Ipv6Addr::new(s[0], s[1], s[2], 0, 0, 0, 0, 0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ManualClock;
    use crate::schema::{
        Candidate, CandidateId, CandidateIdentity, Election, ElectionPhase, Position, PositionId,
    };
    use crate::storage::StorageError;
    use chrono::{Duration, TimeZone};

    fn nine() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    struct Fixture {
        store: Arc<Store>,
        clock: Arc<ManualClock>,
        ledger: BallotLedger,
        election: ElectionId,
        president: PositionId,
        a: CandidateId,
        b: CandidateId,
    }

    fn candidate(position_id: PositionId, name: &str) -> Candidate {
        Candidate {
            id: CandidateId::new(),
            position_id,
            identity: CandidateIdentity::new(),
            full_name: name.to_string(),
            department: String::new(),
            level: String::new(),
            manifesto: String::new(),
            created_at: nine(),
        }
    }

    fn fixture(phase: ElectionPhase) -> Fixture {
        let store = Arc::new(Store::in_memory());
        let clock = Arc::new(ManualClock::new(nine() + Duration::minutes(30)));
        let election = Election {
            id: ElectionId::new(),
            title: "Student Union".to_string(),
            description: String::new(),
            start: nine(),
            end: nine() + Duration::hours(1),
            phase,
            created_at: nine(),
            updated_at: nine(),
        };
        let president = Position {
            id: PositionId::new(),
            election_id: election.id,
            title: "President".to_string(),
            description: String::new(),
            display_order: 0,
            max_selections: 1,
        };
        let a = candidate(president.id, "Ada");
        let b = candidate(president.id, "Brook");
        let fx = Fixture {
            store: store.clone(),
            clock: clock.clone(),
            ledger: BallotLedger::new(store.clone(), clock),
            election: election.id,
            president: president.id,
            a: a.id,
            b: b.id,
        };
        store
            .transact(|txn| {
                txn.stage(Mutation::PutElection(election));
                txn.stage(Mutation::InsertPosition(president));
                txn.stage(Mutation::InsertCandidate(a));
                txn.stage(Mutation::InsertCandidate(b));
                Ok::<_, StorageError>(())
            })
            .unwrap();
        fx
    }

    #[test]
    fn test_cast_writes_votes_and_participation() {
        let fx = fixture(ElectionPhase::Active);
        let voter = VoterId::new();
        let ballot = BallotSelections::new().with(fx.president, fx.a);

        let receipt = fx.ledger.cast_ballots(&voter, &fx.election, &ballot, None).unwrap();
        assert_eq!(receipt.votes_recorded, 1);
        assert_eq!(receipt.election_id, fx.election);

        let snapshot = fx.store.snapshot();
        assert_eq!(snapshot.vote_count(&fx.a), 1);
        assert_eq!(snapshot.participation_count(&fx.election), 1);

        let proof = fx.ledger.verify_participation(&receipt.verification_code).unwrap();
        assert_eq!(proof.election_id, fx.election);
        assert!(proof.voted_at >= nine());
    }

    #[test]
    fn test_second_ballot_rejected() {
        let fx = fixture(ElectionPhase::Active);
        let voter = VoterId::new();
        fx.ledger
            .cast_ballots(&voter, &fx.election, &BallotSelections::new().with(fx.president, fx.a), None)
            .unwrap();

        fx.clock.advance(Duration::minutes(1));
        let err = fx
            .ledger
            .cast_ballots(&voter, &fx.election, &BallotSelections::new().with(fx.president, fx.b), None)
            .unwrap_err();
        assert_eq!(err, LedgerError::DuplicateParticipation);
        assert_eq!(fx.store.snapshot().vote_count(&fx.b), 0);
    }

    #[test]
    fn test_over_selection_writes_nothing() {
        let fx = fixture(ElectionPhase::Active);
        let ballot = BallotSelections::new()
            .with(fx.president, fx.a)
            .with(fx.president, fx.b);
        let before = fx.store.last_commit();

        let err = fx
            .ledger
            .cast_ballots(&VoterId::new(), &fx.election, &ballot, None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::TooManySelections { selected: 2, max: 1, .. }));
        assert_eq!(fx.store.last_commit(), before);
        assert_eq!(fx.store.snapshot().total_votes(), 0);
    }

    #[test]
    fn test_closed_and_out_of_window() {
        let fx = fixture(ElectionPhase::Scheduled);
        let ballot = BallotSelections::new().with(fx.president, fx.a);
        assert!(matches!(
            fx.ledger.cast_ballots(&VoterId::new(), &fx.election, &ballot, None),
            Err(LedgerError::ElectionClosed { phase: ElectionPhase::Scheduled, .. })
        ));

        let fx = fixture(ElectionPhase::Active);
        fx.clock.set(nine() + Duration::hours(1));
        let ballot = BallotSelections::new().with(fx.president, fx.a);
        assert!(matches!(
            fx.ledger.cast_ballots(&VoterId::new(), &fx.election, &ballot, None),
            Err(LedgerError::ElectionClosed { phase: ElectionPhase::Active, .. })
        ));
        assert_eq!(fx.store.snapshot().total_votes(), 0);
    }

    #[test]
    fn test_unknown_position_and_candidate() {
        let fx = fixture(ElectionPhase::Active);
        let stray = PositionId::new();
        let err = fx
            .ledger
            .cast_ballots(
                &VoterId::new(),
                &fx.election,
                &BallotSelections::new().with(stray, fx.a),
                None,
            )
            .unwrap_err();
        assert_eq!(err, LedgerError::InvalidPosition(stray));

        let ghost = CandidateId::new();
        let err = fx
            .ledger
            .cast_ballots(
                &VoterId::new(),
                &fx.election,
                &BallotSelections::new().with(fx.president, ghost),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnknownCandidate { candidate_id, .. } if candidate_id == ghost));
    }

    #[test]
    fn test_empty_ballot() {
        let fx = fixture(ElectionPhase::Active);
        let err = fx
            .ledger
            .cast_ballots(&VoterId::new(), &fx.election, &BallotSelections::new(), None)
            .unwrap_err();
        assert_eq!(err, LedgerError::EmptyBallot);
    }

    #[test]
    fn test_origin_is_coarsened() {
        let fx = fixture(ElectionPhase::Active);
        let origin: IpAddr = "203.0.113.77".parse().unwrap();
        fx.ledger
            .cast_ballots(
                &VoterId::new(),
                &fx.election,
                &BallotSelections::new().with(fx.president, fx.a),
                Some(origin),
            )
            .unwrap();
        let votes = fx.store.snapshot().votes_of(&fx.a);
        assert_eq!(votes[0].origin_hint, Some("203.0.113.0".parse().unwrap()));

        let v6: IpAddr = "2001:db8:abcd:12::1".parse().unwrap();
        assert_eq!(coarsen_origin(v6), "2001:db8:abcd::".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_unknown_code() {
        let fx = fixture(ElectionPhase::Active);
        let code = VerificationCode::from_bytes(&[1; 16]);
        assert!(fx.ledger.verify_participation(&code).is_none());
    }
}
