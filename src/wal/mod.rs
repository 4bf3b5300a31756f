//! Write-Ahead Log subsystem
//!
//! The WAL is the authoritative durability mechanism of the ballot store.
//! No commit is acknowledged unless its record is fully persisted.
//!
//! # Invariants Enforced
//!
//! - fsync before acknowledgment
//! - WAL append precedes applying a commit to the in-memory tables
//! - Sequential, deterministic replay from byte 0
//! - Checksums on every record
//! - Halt on corruption

mod errors;
mod reader;
mod record;
mod writer;

pub use errors::{Severity, WalError, WalErrorCode, WalResult};
pub use reader::WalReader;
pub use record::{compute_checksum, verify_checksum, WalRecord, FRAME_OVERHEAD};
pub use writer::{wal_path, WalWriter, WAL_DIR, WAL_FILE};
