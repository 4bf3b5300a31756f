//! Conflict Retry Tests
//!
//! A verification code collision is a transient conflict: the whole cast
//! is repeated with fresh material, and an exhausted retry budget leaves
//! nothing behind.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use ballotdb::ballot::{generate_code, BallotSelections, CodeSource, LedgerError};
use ballotdb::engine::VotingEngine;
use ballotdb::identity::{InMemoryIdentityProvider, ManualClock};
use ballotdb::lifecycle::{NewCandidate, NewElection, NewPosition};
use ballotdb::observability::{AuditOutcome, MemoryAuditLog};
use ballotdb::schema::{
    CandidateId, CandidateIdentity, ElectionId, ElectionPhase, PositionId, VerificationCode,
};
use ballotdb::storage::constraints::PARTICIPATION_VERIFICATION_CODE;
use ballotdb::storage::Store;
use chrono::{DateTime, Duration, TimeZone, Utc};

// =============================================================================
// Test Utilities
// =============================================================================

/// Hands out queued codes first, then random ones.
#[derive(Default)]
struct QueuedCodes {
    queue: Mutex<VecDeque<VerificationCode>>,
}

impl QueuedCodes {
    fn push(&self, code: &VerificationCode, times: usize) {
        let mut queue = self.queue.lock().unwrap();
        for _ in 0..times {
            queue.push_back(code.clone());
        }
    }
}

impl CodeSource for QueuedCodes {
    fn next_code(&self) -> VerificationCode {
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(generate_code)
    }
}

fn ten() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 11, 3, 10, 0, 0).unwrap()
}

struct Booth {
    engine: VotingEngine,
    identity: Arc<InMemoryIdentityProvider>,
    codes: Arc<QueuedCodes>,
    audit: MemoryAuditLog,
    election: ElectionId,
    position: PositionId,
    candidate: CandidateId,
}

fn booth(max_retries: u32) -> Booth {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let codes = Arc::new(QueuedCodes::default());
    let audit = MemoryAuditLog::new();
    let engine = VotingEngine::builder(Arc::new(Store::in_memory()))
        .clock(Arc::new(ManualClock::new(ten())))
        .identity(identity.clone())
        .code_source(codes.clone())
        .audit(Arc::new(audit.clone()))
        .max_conflict_retries(max_retries)
        .build();

    let election = engine
        .create_election(NewElection {
            title: "Ward 7".to_string(),
            description: String::new(),
            start: ten(),
            end: ten() + Duration::hours(8),
            phase: ElectionPhase::Draft,
        })
        .unwrap()
        .value
        .id;
    let position = engine
        .add_position(NewPosition {
            election_id: election,
            title: "Councillor".to_string(),
            description: String::new(),
            display_order: 0,
            max_selections: 1,
        })
        .unwrap()
        .value
        .id;
    let candidate = engine
        .add_candidate(NewCandidate {
            position_id: position,
            identity: CandidateIdentity::new(),
            full_name: "Priya Nair".to_string(),
            department: "Ward 7".to_string(),
            level: "Resident".to_string(),
            manifesto: String::new(),
        })
        .unwrap()
        .value
        .id;
    engine
        .transition_election(&election, ElectionPhase::Active)
        .unwrap();

    Booth {
        engine,
        identity,
        codes,
        audit,
        election,
        position,
        candidate,
    }
}

impl Booth {
    fn selections(&self) -> BallotSelections {
        BallotSelections::new().with(self.position, self.candidate)
    }

    /// Commits one ballot and returns the code it was issued.
    fn first_ballot(&self) -> VerificationCode {
        let voter = self.identity.register_voter();
        self.engine
            .cast_ballots(&voter, &self.election, &self.selections(), None)
            .unwrap()
            .into_value()
            .verification_code
    }
}

// =============================================================================
// Retry
// =============================================================================

/// One collision is absorbed by a retry with a fresh code.
#[test]
fn test_collision_is_retried() {
    let b = booth(3);
    let taken = b.first_ballot();

    b.codes.push(&taken, 1);
    let voter = b.identity.register_voter();
    let receipt = b
        .engine
        .cast_ballots_with_retry(&voter, &b.election, &b.selections(), None)
        .unwrap()
        .into_value();

    assert_ne!(receipt.verification_code, taken);
    assert_eq!(b.engine.metrics().conflict_retries, 1);
    assert_eq!(b.engine.metrics().ballots_cast, 2);

    let tally = b.engine.tally(&b.election).unwrap();
    assert_eq!(tally.total_votes, 2);
    assert_eq!(tally.ballots_cast, 2);
}

/// The single-attempt cast surfaces the conflict without retrying.
#[test]
fn test_plain_cast_reports_conflict() {
    let b = booth(3);
    let taken = b.first_ballot();

    b.codes.push(&taken, 1);
    let voter = b.identity.register_voter();
    let err = b
        .engine
        .cast_ballots(&voter, &b.election, &b.selections(), None)
        .unwrap_err();

    assert_eq!(
        err,
        LedgerError::StorageConflict {
            constraint: PARTICIPATION_VERIFICATION_CODE
        }
    );
    assert_eq!(b.engine.metrics().conflict_retries, 0);
}

/// Running out of retries returns the conflict and writes nothing.
#[test]
fn test_exhausted_retries_leave_no_trace() {
    let b = booth(2);
    let taken = b.first_ballot();
    let commit_before = b.engine.last_commit();

    b.codes.push(&taken, 3);
    let voter = b.identity.register_voter();
    let err = b
        .engine
        .cast_ballots_with_retry(&voter, &b.election, &b.selections(), None)
        .unwrap_err();

    assert_eq!(
        err,
        LedgerError::StorageConflict {
            constraint: PARTICIPATION_VERIFICATION_CODE
        }
    );
    assert_eq!(b.engine.last_commit(), commit_before);
    assert!(!b.engine.store().snapshot().has_participated(&voter, &b.election));

    let tally = b.engine.tally(&b.election).unwrap();
    assert_eq!(tally.total_votes, 1);
    assert_eq!(tally.ballots_cast, 1);

    let metrics = b.engine.metrics();
    assert_eq!(metrics.conflict_retries, 2);
    assert_eq!(metrics.ballots_rejected, 1);

    let last = b.audit.entries().pop().unwrap();
    assert_eq!(last.outcome, AuditOutcome::Rejected);
    assert_eq!(last.error_code.as_deref(), Some("BALLOT_STORAGE_CONFLICT"));

    // The voter was never recorded, so a later attempt goes through.
    b.engine
        .cast_ballots_with_retry(&voter, &b.election, &b.selections(), None)
        .unwrap();
    assert_eq!(b.engine.tally(&b.election).unwrap().total_votes, 2);
}
