//! Storage subsystem
//!
//! The transactional ballot store: versioned tables, named constraints
//! checked at commit, WAL-first atomic commits and snapshot reads.
//!
//! # Invariants Enforced
//!
//! - A commit is all or nothing; a rejected batch leaves no trace
//! - Uniqueness checks and inserts happen in one step under the writer
//!   lock, so concurrent conflicting commits yield exactly one winner
//! - WAL append and fsync precede applying a commit
//! - Readers see whole commits only

pub mod constraints;
mod errors;
mod mutation;
mod store;
mod tables;

pub use errors::{
    ConstraintKind, ConstraintViolation, Severity, StorageError, StorageErrorCode, StorageResult,
};
pub use mutation::{decode_batch, encode_batch, Mutation};
pub use store::{Snapshot, Store, StoreStats, Transaction};
