//! Observable events
//!
//! Every structured log line the engine writes names one of these.

use std::fmt;

use super::logger::Severity;

/// Observable events in the ballot engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Startup
    ConfigLoaded,
    StoreOpened,
    WalReplayBegin,
    WalReplayComplete,
    RecoveryFailed,

    // Commits
    StoreCommit,
    StoreCommitRejected,
    WalAppendFailed,
    StoreHalted,

    // Ballots
    BallotCast,
    BallotRejected,
    BallotRetry,
    EligibilityChecked,
    ParticipationVerified,

    // Administration
    ElectionCreated,
    ElectionUpdated,
    ElectionDeleted,
    ElectionTransitioned,
    BallotStructureChanged,
    VoterPurged,
    AdminRejected,

    // Reads
    TallyComputed,

    // Audit
    AuditEmitFailed,
}

impl Event {
    /// Returns the event name string
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::StoreOpened => "STORE_OPENED",
            Event::WalReplayBegin => "WAL_REPLAY_BEGIN",
            Event::WalReplayComplete => "WAL_REPLAY_COMPLETE",
            Event::RecoveryFailed => "RECOVERY_FAILED",
            Event::StoreCommit => "STORE_COMMIT",
            Event::StoreCommitRejected => "STORE_COMMIT_REJECTED",
            Event::WalAppendFailed => "WAL_APPEND_FAILED",
            Event::StoreHalted => "STORE_HALTED",
            Event::BallotCast => "BALLOT_CAST",
            Event::BallotRejected => "BALLOT_REJECTED",
            Event::BallotRetry => "BALLOT_RETRY",
            Event::EligibilityChecked => "ELIGIBILITY_CHECKED",
            Event::ParticipationVerified => "PARTICIPATION_VERIFIED",
            Event::ElectionCreated => "ELECTION_CREATED",
            Event::ElectionUpdated => "ELECTION_UPDATED",
            Event::ElectionDeleted => "ELECTION_DELETED",
            Event::ElectionTransitioned => "ELECTION_TRANSITIONED",
            Event::BallotStructureChanged => "BALLOT_STRUCTURE_CHANGED",
            Event::VoterPurged => "VOTER_PURGED",
            Event::AdminRejected => "ADMIN_REJECTED",
            Event::TallyComputed => "TALLY_COMPUTED",
            Event::AuditEmitFailed => "AUDIT_EMIT_FAILED",
        }
    }

    /// Returns the severity this event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::RecoveryFailed | Event::StoreHalted => Severity::Fatal,
            Event::WalAppendFailed => Severity::Error,
            Event::BallotRejected
            | Event::BallotRetry
            | Event::AdminRejected
            | Event::AuditEmitFailed => Severity::Warn,
            Event::StoreCommit
            | Event::StoreCommitRejected
            | Event::EligibilityChecked
            | Event::ParticipationVerified
            | Event::TallyComputed => Severity::Trace,
            _ => Severity::Info,
        }
    }

    /// Whether this event halts the store
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
