//! Recovery subsystem
//!
//! Recovery replays the WAL to rebuild the ballot store at open.
//!
//! # Startup Sequence (strict order)
//!
//! 1. Open the WAL reader
//! 2. Replay every record from offset 0 sequentially
//! 3. Validate and apply each batch to fresh tables
//! 4. Advance the commit authority by exactly one per record
//! 5. Open the WAL writer positioned after the last record
//!
//! Any failure halts the open. There is no partial recovery.

mod errors;
mod replay;

pub use errors::{RecoveryError, RecoveryErrorCode, RecoveryResult, Severity};
pub use replay::{ReplayStats, StorageApply, WalRead, WalReplayer};
