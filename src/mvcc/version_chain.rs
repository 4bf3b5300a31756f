//! VersionChain - Version history for a row
//!
//! - Versions form a total order for each row key, ascending by commit
//! - Each version supersedes exactly one prior version (if any)
//! - No forks or branches

use super::{CommitId, ReadView, Version, Visibility};

/// The complete version history of a single logical row.
#[derive(Clone, Debug)]
pub struct VersionChain<T> {
    versions: Vec<Version<T>>,
}

impl<T> VersionChain<T> {
    /// Creates a chain whose first version is `row` at `commit_id`.
    pub fn created(row: T, commit_id: CommitId) -> Self {
        Self {
            versions: vec![Version::row(row, commit_id)],
        }
    }

    /// Returns the number of versions in this chain.
    #[inline]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Returns true if this chain has no versions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Returns a slice of all versions, oldest first.
    #[inline]
    pub fn versions(&self) -> &[Version<T>] {
        &self.versions
    }

    /// Appends a new row version.
    ///
    /// Callers append under the store's writer lock with the commit
    /// identity currently being applied, so commit order holds.
    pub fn push_row(&mut self, row: T, commit_id: CommitId) {
        debug_assert!(self.versions.last().map_or(true, |v| v.commit_id() <= commit_id));
        self.versions.push(Version::row(row, commit_id));
    }

    /// Appends a tombstone version.
    pub fn push_tombstone(&mut self, commit_id: CommitId) {
        debug_assert!(self.versions.last().map_or(true, |v| v.commit_id() <= commit_id));
        self.versions.push(Version::tombstone(commit_id));
    }

    /// The newest version's row, ignoring read views.
    ///
    /// Only meaningful under the writer lock, where head state is the
    /// state a new commit is validated against.
    pub fn head(&self) -> Option<&T> {
        self.versions.last().and_then(|v| v.payload().row())
    }

    /// Returns true if the newest version is a live row.
    pub fn is_live(&self) -> bool {
        self.head().is_some()
    }

    /// The row visible to `view`, if any.
    pub fn visible(&self, view: ReadView) -> Option<&T> {
        Visibility::visible_row(self, view)
    }

    /// Returns true if the row had been created by `view`, whether or not
    /// it has since been tombstoned.
    pub fn existed_at(&self, view: ReadView) -> bool {
        self.versions
            .first()
            .map_or(false, |v| view.includes(v.commit_id()))
    }
}
