//! WAL reader with strict corruption detection
//!
//! Zero tolerance: any framing, checksum or ordering violation fails the
//! read. There is no partial replay, no skipping and no repair. Commit
//! identities must start at 1 and increase by exactly one.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::errors::{WalError, WalResult};
use super::record::{WalRecord, FRAME_OVERHEAD};

/// WAL reader for sequential replay.
pub struct WalReader {
    wal_path: PathBuf,
    reader: BufReader<File>,
    current_offset: u64,
    file_size: u64,
    last_commit: u64,
}

impl WalReader {
    /// Opens a WAL file for reading.
    pub fn open(wal_path: &Path) -> WalResult<Self> {
        let file = File::open(wal_path).map_err(|e| {
            WalError::corruption(format!(
                "Failed to open WAL file {}: {}",
                wal_path.display(),
                e
            ))
        })?;

        let file_size = file
            .metadata()
            .map_err(|e| WalError::corruption(format!("Failed to read WAL metadata: {}", e)))?
            .len();

        Ok(Self {
            wal_path: wal_path.to_path_buf(),
            reader: BufReader::new(file),
            current_offset: 0,
            file_size,
            last_commit: 0,
        })
    }

    /// Returns the path to the WAL file.
    pub fn path(&self) -> &Path {
        &self.wal_path
    }

    /// Returns the current byte offset in the file.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Returns the last successfully read commit identity, or 0.
    pub fn last_commit(&self) -> u64 {
        self.last_commit
    }

    /// Reads the next record.
    ///
    /// - `Ok(Some(record))` if a record was read and validated
    /// - `Ok(None)` at a clean end of file
    /// - `Err(WalError)` on any corruption or read error
    pub fn read_next(&mut self) -> WalResult<Option<WalRecord>> {
        if self.current_offset >= self.file_size {
            return Ok(None);
        }

        let remaining = self.file_size - self.current_offset;
        if remaining < FRAME_OVERHEAD as u64 {
            return Err(WalError::corruption_at_offset(
                self.current_offset,
                format!("Truncated WAL: {} trailing bytes", remaining),
            ));
        }

        let mut len_buf = [0u8; 4];
        self.reader.read_exact(&mut len_buf).map_err(|e| {
            WalError::corruption_at_offset(
                self.current_offset,
                format!("Failed to read record length: {}", e),
            )
        })?;
        let record_length = u32::from_le_bytes(len_buf) as u64;

        if record_length < FRAME_OVERHEAD as u64 || record_length > remaining {
            return Err(WalError::corruption_at_offset(
                self.current_offset,
                format!(
                    "Invalid record length {} with {} bytes remaining",
                    record_length, remaining
                ),
            ));
        }

        let mut frame = vec![0u8; record_length as usize];
        frame[0..4].copy_from_slice(&len_buf);
        self.reader.read_exact(&mut frame[4..]).map_err(|e| {
            WalError::corruption_at_offset(
                self.current_offset,
                format!("Failed to read record body: {}", e),
            )
        })?;

        let (record, consumed) = WalRecord::deserialize(&frame).map_err(|e| {
            WalError::corruption_at_offset(self.current_offset, e.message().to_string())
        })?;

        let commit = record.commit_id.value();
        if commit != self.last_commit + 1 {
            return Err(WalError::corruption_at_commit(
                commit,
                format!(
                    "Non-sequential commit identity: expected {}, got {}",
                    self.last_commit + 1,
                    commit
                ),
            ));
        }

        self.current_offset += consumed as u64;
        self.last_commit = commit;

        Ok(Some(record))
    }

    /// Reads all remaining records.
    pub fn read_all(&mut self) -> WalResult<Vec<WalRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_next()? {
            records.push(record);
        }
        Ok(records)
    }
}
