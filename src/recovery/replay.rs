//! WAL replay for recovery
//!
//! Replays WAL records sequentially from byte 0 to rebuild the store.
//!
//! - Must start at byte 0 (there are no checkpoints)
//! - Must read sequentially
//! - Checksum is validated for every record by the reader
//! - On ANY corruption: FATAL error, abort immediately

use crate::mvcc::CommitId;
use crate::storage::{decode_batch, Mutation};
use crate::wal::{WalReader, WalRecord};

use super::errors::{RecoveryError, RecoveryResult};

/// Applies replayed commits to storage.
pub trait StorageApply {
    /// Apply one committed batch. Batches arrive in commit order.
    fn apply_batch(&mut self, commit_id: CommitId, batch: Vec<Mutation>) -> RecoveryResult<()>;
}

/// Source of WAL records.
pub trait WalRead {
    /// Read the next WAL record.
    /// Returns None at the end of the WAL, Err on corruption.
    fn read_next(&mut self) -> RecoveryResult<Option<WalRecord>>;

    /// Current byte offset in the WAL.
    fn current_offset(&self) -> u64;
}

impl WalRead for WalReader {
    fn read_next(&mut self) -> RecoveryResult<Option<WalRecord>> {
        let offset = self.current_offset();
        WalReader::read_next(self).map_err(|e| RecoveryError::wal_corruption(offset, e.to_string()))
    }

    fn current_offset(&self) -> u64 {
        WalReader::current_offset(self)
    }
}

/// Statistics from WAL replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Number of commits replayed
    pub commits_replayed: u64,
    /// Number of mutations across all commits
    pub mutations_replayed: u64,
    /// Final WAL offset
    pub final_offset: u64,
    /// Highest commit identity replayed, 0 for an empty WAL
    pub final_commit: u64,
}

/// WAL replayer that processes WAL records sequentially
pub struct WalReplayer;

impl WalReplayer {
    /// Replay all WAL records to storage.
    ///
    /// Replay is deterministic: the same WAL always produces identical
    /// state.
    pub fn replay<W: WalRead, S: StorageApply>(
        wal: &mut W,
        storage: &mut S,
    ) -> RecoveryResult<ReplayStats> {
        let mut stats = ReplayStats::default();

        while let Some(record) = wal.read_next()? {
            let commit = record.commit_id.value();
            let batch = decode_batch(&record.payload)
                .map_err(|e| RecoveryError::invalid_payload(commit, e.to_string()))?;

            stats.mutations_replayed += batch.len() as u64;
            storage.apply_batch(record.commit_id, batch)?;

            stats.commits_replayed += 1;
            stats.final_commit = commit;
        }

        stats.final_offset = wal.current_offset();
        Ok(stats)
    }
}
