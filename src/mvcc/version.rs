//! Version - Immutable row version
//!
//! - A version is an immutable representation of a row at one commit
//! - It carries a complete row payload OR an explicit tombstone
//! - Updates create new versions; deletes are tombstone versions

use super::CommitId;

/// The payload of a version: either a row or an explicit tombstone.
///
/// Tombstone is explicit, NOT represented via Option.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VersionPayload<T> {
    /// A complete row.
    Row(T),
    /// An explicit deletion marker.
    Tombstone,
}

impl<T> VersionPayload<T> {
    /// Returns true if this payload is a tombstone.
    #[inline]
    pub fn is_tombstone(&self) -> bool {
        matches!(self, VersionPayload::Tombstone)
    }

    /// Returns the row, if this is not a tombstone.
    #[inline]
    pub fn row(&self) -> Option<&T> {
        match self {
            VersionPayload::Row(row) => Some(row),
            VersionPayload::Tombstone => None,
        }
    }
}

/// A single immutable row version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Version<T> {
    payload: VersionPayload<T>,
    commit_id: CommitId,
}

impl<T> Version<T> {
    /// Creates a row version.
    pub fn row(row: T, commit_id: CommitId) -> Self {
        Self {
            payload: VersionPayload::Row(row),
            commit_id,
        }
    }

    /// Creates a tombstone version.
    pub fn tombstone(commit_id: CommitId) -> Self {
        Self {
            payload: VersionPayload::Tombstone,
            commit_id,
        }
    }

    /// Returns the payload.
    #[inline]
    pub fn payload(&self) -> &VersionPayload<T> {
        &self.payload
    }

    /// Returns the commit identity that produced this version.
    #[inline]
    pub fn commit_id(&self) -> CommitId {
        self.commit_id
    }

    /// Returns true if this version is a tombstone.
    #[inline]
    pub fn is_tombstone(&self) -> bool {
        self.payload.is_tombstone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_version() {
        let v = Version::row("doc", CommitId::new(3));
        assert!(!v.is_tombstone());
        assert_eq!(v.payload().row(), Some(&"doc"));
        assert_eq!(v.commit_id(), CommitId::new(3));
    }

    #[test]
    fn test_tombstone_has_no_row() {
        let v: Version<&str> = Version::tombstone(CommitId::new(4));
        assert!(v.is_tombstone());
        assert_eq!(v.payload().row(), None);
    }
}
