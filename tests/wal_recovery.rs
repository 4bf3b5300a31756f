//! WAL Recovery Tests
//!
//! Every acknowledged ballot survives a restart; a damaged log refuses to
//! open rather than serving partial state.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use ballotdb::ballot::{BallotSelections, LedgerError};
use ballotdb::engine::{EngineConfig, EngineError, VotingEngine};
use ballotdb::identity::{InMemoryIdentityProvider, ManualClock};
use ballotdb::lifecycle::{NewCandidate, NewElection, NewPosition};
use ballotdb::schema::{
    CandidateId, CandidateIdentity, ElectionId, ElectionPhase, PositionId, VoterId,
};
use ballotdb::storage::{Store, StorageErrorCode};
use ballotdb::wal::wal_path;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::tempdir;

// =============================================================================
// Test Utilities
// =============================================================================

fn two_pm() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 10, 14, 0, 0).unwrap()
}

fn engine_on(data_dir: &Path, identity: Arc<InMemoryIdentityProvider>) -> VotingEngine {
    let store = Store::open(data_dir).unwrap();
    VotingEngine::builder(Arc::new(store))
        .clock(Arc::new(ManualClock::new(two_pm())))
        .identity(identity)
        .build()
}

struct Ballot {
    election: ElectionId,
    position: PositionId,
    candidates: Vec<CandidateId>,
}

fn seed(engine: &VotingEngine, start: DateTime<Utc>, end: DateTime<Utc>) -> Ballot {
    let election = engine
        .create_election(NewElection {
            title: "Residents Association".to_string(),
            description: String::new(),
            start,
            end,
            phase: ElectionPhase::Draft,
        })
        .unwrap()
        .value
        .id;
    let position = engine
        .add_position(NewPosition {
            election_id: election,
            title: "Treasurer".to_string(),
            description: String::new(),
            display_order: 0,
            max_selections: 1,
        })
        .unwrap()
        .value
        .id;
    let candidates = ["Ama Owusu", "Tomas Berg"]
        .iter()
        .map(|name| {
            engine
                .add_candidate(NewCandidate {
                    position_id: position,
                    identity: CandidateIdentity::new(),
                    full_name: name.to_string(),
                    department: "Block C".to_string(),
                    level: "Resident".to_string(),
                    manifesto: String::new(),
                })
                .unwrap()
                .value
                .id
        })
        .collect();
    engine
        .transition_election(&election, ElectionPhase::Active)
        .unwrap();
    Ballot {
        election,
        position,
        candidates,
    }
}

fn vote(engine: &VotingEngine, ballot: &Ballot, voter: &VoterId, pick: usize) -> String {
    engine
        .cast_ballots(
            voter,
            &ballot.election,
            &BallotSelections::new().with(ballot.position, ballot.candidates[pick]),
            None,
        )
        .unwrap()
        .into_value()
        .verification_code
        .to_string()
}

// =============================================================================
// Replay
// =============================================================================

/// Tallies, codes and uniqueness all survive a reopen.
#[test]
fn test_state_survives_restart() {
    let dir = tempdir().unwrap();
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let voters: Vec<_> = (0..3).map(|_| identity.register_voter()).collect();

    let (ballot, codes, before, last_commit) = {
        let engine = engine_on(dir.path(), identity.clone());
        let ballot = seed(&engine, two_pm(), two_pm() + Duration::hours(2));
        let codes: Vec<_> = voters
            .iter()
            .enumerate()
            .map(|(i, voter)| vote(&engine, &ballot, voter, i % 2))
            .collect();
        let before = engine.tally(&ballot.election).unwrap();
        (ballot, codes, before, engine.last_commit())
    };

    let engine = engine_on(dir.path(), identity.clone());
    assert_eq!(engine.last_commit(), last_commit);
    assert_eq!(engine.tally(&ballot.election).unwrap(), before);
    for code in &codes {
        let proof = engine.verify_participation(code).unwrap();
        assert_eq!(proof.election_id, ballot.election);
    }

    let err = engine
        .cast_ballots(
            &voters[0],
            &ballot.election,
            &BallotSelections::new().with(ballot.position, ballot.candidates[1]),
            None,
        )
        .unwrap_err();
    assert_eq!(err, LedgerError::DuplicateParticipation);

    let late = identity.register_voter();
    vote(&engine, &ballot, &late, 1);
    assert_eq!(engine.last_commit().value(), last_commit.value() + 1);
}

/// Store statistics come back from the data directory, while the
/// process-local counters start over.
#[test]
fn test_stats_rebuilt_after_restart() {
    let dir = tempdir().unwrap();
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let before = {
        let engine = engine_on(dir.path(), identity.clone());
        let ballot = seed(&engine, two_pm(), two_pm() + Duration::hours(2));
        for pick in [0, 1, 1] {
            vote(&engine, &ballot, &identity.register_voter(), pick);
        }
        assert_eq!(engine.metrics().ballots_cast, 3);
        engine.stats()
    };
    assert_eq!(before.ballots_recorded, 3);
    assert_eq!(before.votes_recorded, 3);
    assert_eq!(before.elections, 1);
    assert_eq!(before.wal_records, before.last_commit);

    let engine = engine_on(dir.path(), identity);
    let after = engine.stats();
    assert_eq!(after, before);
    assert_eq!(
        after.wal_bytes,
        fs::metadata(wal_path(dir.path())).unwrap().len()
    );
    assert_eq!(engine.metrics().ballots_cast, 0);
    assert_eq!(engine.metrics().wal_records, after.last_commit);
}

/// A flipped byte anywhere in the log fails the open.
#[test]
fn test_corrupt_wal_refuses_to_open() {
    let dir = tempdir().unwrap();
    let identity = Arc::new(InMemoryIdentityProvider::new());
    {
        let engine = engine_on(dir.path(), identity.clone());
        let ballot = seed(&engine, two_pm(), two_pm() + Duration::hours(2));
        vote(&engine, &ballot, &identity.register_voter(), 0);
    }

    let path = wal_path(dir.path());
    let mut bytes = fs::read(&path).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    let err = Store::open(dir.path()).err().unwrap();
    assert_eq!(err.code(), StorageErrorCode::Recovery);
    assert!(err.is_fatal());
}

/// A truncated tail is corruption too.
#[test]
fn test_truncated_wal_refuses_to_open() {
    let dir = tempdir().unwrap();
    let identity = Arc::new(InMemoryIdentityProvider::new());
    {
        let engine = engine_on(dir.path(), identity.clone());
        seed(&engine, two_pm(), two_pm() + Duration::hours(2));
    }

    let path = wal_path(dir.path());
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

    assert!(Store::open(dir.path()).is_err());
}

// =============================================================================
// Engine boot
// =============================================================================

/// The configured engine reads its roster and keeps the audit trail on disk.
#[test]
fn test_engine_open_from_config() {
    let dir = tempdir().unwrap();
    let voter = VoterId::new();
    let roster = dir.path().join("roster.json");
    fs::write(
        &roster,
        format!(
            r#"{{"voters":[{{"voter_id":"{}","role":"voter"}}]}}"#,
            voter
        ),
    )
    .unwrap();

    let mut config = EngineConfig::for_data_dir(dir.path().join("data"));
    config.roster_path = Some(roster);

    let now = Utc::now();
    let receipt_code = {
        let engine = VotingEngine::open(&config).unwrap();
        let ballot = seed(&engine, now - Duration::minutes(5), now + Duration::hours(1));
        assert!(engine.can_vote(&voter, &ballot.election).is_allowed());
        vote(&engine, &ballot, &voter, 0)
    };

    let engine = VotingEngine::open(&config).unwrap();
    assert!(engine.verify_participation(&receipt_code).is_some());

    let audit = fs::read_to_string(config.audit_path()).unwrap();
    assert!(audit.lines().any(|line| line.contains("BALLOT_CAST")));
}

/// A bad roster path is a boot error, not an empty electorate.
#[test]
fn test_engine_open_missing_roster() {
    let dir = tempdir().unwrap();
    let mut config = EngineConfig::for_data_dir(dir.path());
    config.roster_path = Some(dir.path().join("absent.json"));

    let err = VotingEngine::open(&config).err().unwrap();
    assert!(matches!(err, EngineError::Identity(_)));
}
