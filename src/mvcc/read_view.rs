//! ReadView - Stable snapshot boundary
//!
//! A read view is established at read start and never changes during the
//! read. It is defined by a single scalar: the highest commit identity
//! visible to the read.

use super::CommitId;

/// A stable snapshot boundary for read operations.
///
/// All row versions with `commit_id > upper_bound` are invisible to reads
/// using this view. Once established, a read view never sees partial
/// writes and never sees future versions.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ReadView {
    read_upper_bound: CommitId,
}

impl ReadView {
    /// Creates a new read view with the given upper bound.
    #[inline]
    pub fn new(upper_bound: CommitId) -> Self {
        Self {
            read_upper_bound: upper_bound,
        }
    }

    /// Returns the upper bound commit identity.
    #[inline]
    pub fn upper_bound(&self) -> CommitId {
        self.read_upper_bound
    }

    /// Whether a version committed at `commit_id` is inside this view.
    #[inline]
    pub fn includes(&self, commit_id: CommitId) -> bool {
        commit_id <= self.read_upper_bound
    }
}
