//! Audit logging
//!
//! - Every administrative mutation and every ballot attempt is logged
//! - Every outcome (success, rejection, failure) is logged
//! - The audit log is append-only and durable: writes are synced before
//!   `append` returns
//! - Entries never name a candidate a voter selected
//!
//! Audit failure never rolls back the operation it describes. Callers
//! turn a failed append into an `AuditFault` next to their result.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::ElectionId;

/// Audit action type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    ElectionCreated,
    ElectionUpdated,
    ElectionDeleted,
    ElectionTransitioned,
    PositionAdded,
    PositionRemoved,
    CandidateAdded,
    CandidateRemoved,
    BallotCast,
    VoterPurged,
}

impl AuditAction {
    /// Returns the action name string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::ElectionCreated => "ELECTION_CREATED",
            AuditAction::ElectionUpdated => "ELECTION_UPDATED",
            AuditAction::ElectionDeleted => "ELECTION_DELETED",
            AuditAction::ElectionTransitioned => "ELECTION_TRANSITIONED",
            AuditAction::PositionAdded => "POSITION_ADDED",
            AuditAction::PositionRemoved => "POSITION_REMOVED",
            AuditAction::CandidateAdded => "CANDIDATE_ADDED",
            AuditAction::CandidateRemoved => "CANDIDATE_REMOVED",
            AuditAction::BallotCast => "BALLOT_CAST",
            AuditAction::VoterPurged => "VOTER_PURGED",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Audit entry outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOutcome {
    /// Action committed.
    Success,
    /// Action refused by validation, state or conflict rules.
    Rejected,
    /// Action failed in storage.
    Failed,
}

impl AuditOutcome {
    /// Returns the outcome string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Success => "SUCCESS",
            AuditOutcome::Rejected => "REJECTED",
            AuditOutcome::Failed => "FAILED",
        }
    }
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single audit entry. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub outcome: AuditOutcome,
    /// Who performed the action: a voter id for ballots, an operator
    /// name for administration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub election_id: Option<ElectionId>,
    /// The row acted on (position, candidate, voter), if not the election.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEntry {
    /// Create a new audit entry.
    pub fn new(action: AuditAction, outcome: AuditOutcome, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            action,
            outcome,
            actor: None,
            election_id: None,
            target: None,
            error_code: None,
            detail: None,
        }
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_election(mut self, election_id: ElectionId) -> Self {
        self.election_id = Some(election_id);
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Serialize to one JSON line (without the newline).
    pub fn to_json(&self) -> io::Result<String> {
        serde_json::to_string(self).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Failure to record an audit entry after the primary operation
/// finished. The operation's own result stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditFault {
    pub action: AuditAction,
    pub reason: String,
}

impl fmt::Display for AuditFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[WARN] BALLOT_AUDIT_EMIT_FAILED: {} entry not recorded: {}", self.action, self.reason)
    }
}

/// Append-only audit sink.
pub trait AuditLog: Send + Sync {
    /// Append an entry. Synchronous and durable: the entry is on disk
    /// when this returns `Ok`.
    fn append(&self, entry: &AuditEntry) -> io::Result<()>;

    /// Sync the audit log to durable storage.
    fn sync(&self) -> io::Result<()>;
}

fn lock<T>(mutex: &Mutex<T>) -> io::Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "audit log lock poisoned"))
}

/// File-based audit log: one JSON entry per line, fsync after each write.
pub struct FileAuditLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileAuditLog {
    /// Open or create an audit log file, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Get the audit log path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every entry back, oldest first.
    pub fn read_all(&self) -> io::Result<Vec<AuditEntry>> {
        let contents = fs::read_to_string(&self.path)?;
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
            })
            .collect()
    }
}

impl AuditLog for FileAuditLog {
    fn append(&self, entry: &AuditEntry) -> io::Result<()> {
        let json = entry.to_json()?;
        let mut writer = lock(&self.writer)?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;
        writer.get_ref().sync_all()
    }

    fn sync(&self) -> io::Result<()> {
        let writer = lock(&self.writer)?;
        writer.get_ref().sync_all()
    }
}

/// In-memory audit log for tests and ephemeral engines.
#[derive(Debug, Default, Clone)]
pub struct MemoryAuditLog {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded entries, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(&self, entry: &AuditEntry) -> io::Result<()> {
        lock(&self.entries)?.push(entry.clone());
        Ok(())
    }

    fn sync(&self) -> io::Result<()> {
        Ok(())
    }
}
