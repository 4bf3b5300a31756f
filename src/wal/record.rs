//! WAL record framing
//!
//! One record per store commit:
//!
//! ```text
//! | length u32 LE | commit_id u64 LE | payload ... | crc32 u32 LE |
//! ```
//!
//! `length` counts the whole frame including itself and the checksum. The
//! CRC32 (IEEE) covers every byte before it. The payload is the JSON
//! encoding of the commit's mutation batch; the WAL does not interpret it.

use crc32fast::Hasher;

use crate::mvcc::CommitId;

use super::errors::{WalError, WalResult};

/// Bytes of framing around the payload.
pub const FRAME_OVERHEAD: usize = 4 + 8 + 4;

/// A single committed transaction as persisted in the WAL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalRecord {
    pub commit_id: CommitId,
    pub payload: Vec<u8>,
}

impl WalRecord {
    /// Creates a record for a commit.
    pub fn new(commit_id: CommitId, payload: Vec<u8>) -> Self {
        Self { commit_id, payload }
    }

    /// Total framed size of this record in bytes.
    pub fn framed_len(&self) -> usize {
        FRAME_OVERHEAD + self.payload.len()
    }

    /// Serializes the record into its on-disk frame.
    pub fn serialize(&self) -> Vec<u8> {
        let total = self.framed_len();
        let mut buf = Vec::with_capacity(total);
        buf.extend_from_slice(&(total as u32).to_le_bytes());
        buf.extend_from_slice(&self.commit_id.value().to_le_bytes());
        buf.extend_from_slice(&self.payload);
        let checksum = compute_checksum(&buf);
        buf.extend_from_slice(&checksum.to_le_bytes());
        buf
    }

    /// Parses one frame from the start of `data`.
    ///
    /// Returns the record and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> WalResult<(Self, usize)> {
        if data.len() < FRAME_OVERHEAD {
            return Err(WalError::corruption(format!(
                "Frame too short: {} bytes, minimum is {}",
                data.len(),
                FRAME_OVERHEAD
            )));
        }

        let total = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if total < FRAME_OVERHEAD || total > data.len() {
            return Err(WalError::corruption(format!(
                "Invalid frame length {} with {} bytes available",
                total,
                data.len()
            )));
        }

        let body_end = total - 4;
        let stored = u32::from_le_bytes([
            data[body_end],
            data[body_end + 1],
            data[body_end + 2],
            data[body_end + 3],
        ]);
        let mut commit_bytes = [0u8; 8];
        commit_bytes.copy_from_slice(&data[4..12]);
        let commit_id = u64::from_le_bytes(commit_bytes);

        if !verify_checksum(&data[..body_end], stored) {
            return Err(WalError::corruption_at_commit(commit_id, "Checksum mismatch"));
        }

        Ok((
            Self {
                commit_id: CommitId::new(commit_id),
                payload: data[12..body_end].to_vec(),
            },
            total,
        ))
    }
}

/// CRC32 (IEEE polynomial) over `data`.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Returns true if `data` hashes to `expected`.
pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}
