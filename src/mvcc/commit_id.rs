//! CommitId - Totally ordered commit identity
//!
//! - Totally orders all store commits
//! - Deterministic across restarts (re-established from WAL replay)
//! - Independent of wall-clock time
//! - No two commits share the same identity

use std::fmt;

use serde::{Deserialize, Serialize};

/// A totally ordered, opaque commit identity.
///
/// Every row version in the store carries the commit identity of the
/// transaction that produced it. Commit identities define a strict total
/// order and are the sole authority for snapshot visibility.
///
/// `CommitId(0)` is the empty store: nothing is visible at it.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CommitId(u64);

impl CommitId {
    /// Creates a new CommitId with the given value.
    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The commit point of an empty store.
    #[inline]
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the underlying value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Returns the identity immediately after this one.
    #[inline]
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_id_requires_explicit_construction() {
        let id = CommitId::new(42);
        assert_eq!(id.value(), 42);
    }

    #[test]
    fn test_commit_id_ordering() {
        assert!(CommitId::new(10) < CommitId::new(20));
        assert!(CommitId::zero() < CommitId::new(1));
    }

    #[test]
    fn test_next_is_successor() {
        assert_eq!(CommitId::new(7).next(), CommitId::new(8));
    }

    #[test]
    fn test_serializes_as_bare_number() {
        let json = serde_json::to_string(&CommitId::new(123)).unwrap();
        assert_eq!(json, "123");
        let back: CommitId = serde_json::from_str("123").unwrap();
        assert_eq!(back, CommitId::new(123));
    }
}
