//! Commit Authority - commit identity assignment
//!
//! - The WAL is the sole source of truth for commit ordering
//! - Commit identities are assigned exactly once
//! - Assignment occurs as part of commit, under the store's writer lock
//! - The ordering is total, strict, and replayable
//!
//! The authority tracks the highest durable commit identity. It never
//! hands out an identity that has not been written to the WAL first.

use std::fmt;

use super::{CommitId, ReadView};

/// Commit authority for store commit identity assignment.
///
/// No clock usage and no independent persistence: on open the authority
/// is rebuilt by observing every replayed commit in order.
#[derive(Debug, Default)]
pub struct CommitAuthority {
    /// The highest commit identity observed during replay or assignment.
    highest_commit_id: u64,
}

impl CommitAuthority {
    /// Create a new commit authority for a fresh store.
    pub fn new() -> Self {
        Self {
            highest_commit_id: 0,
        }
    }

    /// Update the authority with a replayed commit identity.
    ///
    /// Replayed identities must be exactly one past the current highest:
    /// the ledger WAL never skips identities.
    pub fn observe_replayed_commit(&mut self, commit_id: CommitId) -> Result<(), CommitAuthorityError> {
        let value = commit_id.value();
        if value <= self.highest_commit_id {
            return Err(CommitAuthorityError::NonMonotonic {
                observed: value,
                highest: self.highest_commit_id,
            });
        }
        if value != self.highest_commit_id + 1 {
            return Err(CommitAuthorityError::Gap {
                observed: value,
                expected: self.highest_commit_id + 1,
            });
        }
        self.highest_commit_id = value;
        Ok(())
    }

    /// Get the next commit identity to assign.
    ///
    /// The identity is not valid until `mark_committed` is called after
    /// the WAL append for it has been fsynced.
    pub fn next_commit_id(&self) -> CommitId {
        CommitId::new(self.highest_commit_id + 1)
    }

    /// Mark a commit identity as assigned after WAL persistence.
    pub fn mark_committed(&mut self, commit_id: CommitId) -> Result<(), CommitAuthorityError> {
        let id_value = commit_id.value();
        if id_value != self.highest_commit_id + 1 {
            return Err(CommitAuthorityError::OutOfOrder {
                attempted: id_value,
                expected: self.highest_commit_id + 1,
            });
        }
        self.highest_commit_id = id_value;
        Ok(())
    }

    /// Get the current highest commit identity.
    pub fn highest_commit_id(&self) -> Option<CommitId> {
        if self.highest_commit_id == 0 {
            None
        } else {
            Some(CommitId::new(self.highest_commit_id))
        }
    }

    /// Create a read view at the current commit point.
    pub fn current_snapshot(&self) -> ReadView {
        ReadView::new(CommitId::new(self.highest_commit_id))
    }
}

/// Errors from commit authority operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitAuthorityError {
    /// Replayed commit identity is not strictly greater than highest.
    NonMonotonic { observed: u64, highest: u64 },
    /// Replayed commit identity skipped one or more identities.
    Gap { observed: u64, expected: u64 },
    /// Attempted to commit out of order.
    OutOfOrder { attempted: u64, expected: u64 },
}

impl fmt::Display for CommitAuthorityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitAuthorityError::NonMonotonic { observed, highest } => write!(
                f,
                "Non-monotonic commit identity: observed {} but highest is {}",
                observed, highest
            ),
            CommitAuthorityError::Gap { observed, expected } => write!(
                f,
                "Commit identity gap: observed {} but expected {}",
                observed, expected
            ),
            CommitAuthorityError::OutOfOrder { attempted, expected } => write!(
                f,
                "Out of order commit: attempted {} but expected {}",
                attempted, expected
            ),
        }
    }
}

impl std::error::Error for CommitAuthorityError {}
