//! WAL writer with fsync enforcement
//!
//! Every append is followed by fsync. A commit is acknowledged only after
//! its record is durable. No batching, no group commit.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::mvcc::CommitId;

use super::errors::{WalError, WalResult};
use super::reader::WalReader;
use super::record::WalRecord;

/// Relative location of the WAL inside a data directory.
pub const WAL_DIR: &str = "wal";
/// WAL file name.
pub const WAL_FILE: &str = "wal.log";

/// Returns `<data_dir>/wal/wal.log`.
pub fn wal_path(data_dir: &Path) -> PathBuf {
    data_dir.join(WAL_DIR).join(WAL_FILE)
}

/// Append-only WAL writer.
pub struct WalWriter {
    wal_path: PathBuf,
    file: File,
    last_commit: u64,
}

impl WalWriter {
    /// Opens or creates `<data_dir>/wal/wal.log`.
    ///
    /// An existing WAL is scanned to find the last commit identity; a
    /// corrupt WAL fails the open.
    pub fn open(data_dir: &Path) -> WalResult<Self> {
        let wal_dir = data_dir.join(WAL_DIR);
        let wal_path = wal_path(data_dir);

        if !wal_dir.exists() {
            fs::create_dir_all(&wal_dir).map_err(|e| {
                WalError::append_failed(
                    format!("Failed to create WAL directory: {}", wal_dir.display()),
                    e,
                )
            })?;
        }

        let last_commit = Self::scan_last_commit(&wal_path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&wal_path)
            .map_err(|e| {
                WalError::append_failed(format!("Failed to open WAL file: {}", wal_path.display()), e)
            })?;

        Ok(Self {
            wal_path,
            file,
            last_commit,
        })
    }

    fn scan_last_commit(wal_path: &Path) -> WalResult<u64> {
        match fs::metadata(wal_path) {
            Ok(m) if m.len() == 0 => return Ok(0),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(WalError::append_failed("Failed to read WAL metadata", e)),
        }

        let mut reader = WalReader::open(wal_path)?;
        while reader.read_next()?.is_some() {}
        Ok(reader.last_commit())
    }

    /// Returns the path to the WAL file.
    pub fn path(&self) -> &Path {
        &self.wal_path
    }

    /// Returns the last durable commit identity, or 0.
    pub fn last_commit(&self) -> u64 {
        self.last_commit
    }

    /// Appends the record for `commit_id` and fsyncs.
    ///
    /// Returns the number of bytes written.
    pub fn append(&mut self, commit_id: CommitId, payload: Vec<u8>) -> WalResult<u64> {
        if commit_id.value() != self.last_commit + 1 {
            return Err(WalError::corruption_at_commit(
                commit_id.value(),
                format!("Append out of order: expected {}", self.last_commit + 1),
            ));
        }

        let serialized = WalRecord::new(commit_id, payload).serialize();

        self.file.write_all(&serialized).map_err(|e| {
            WalError::append_failed(format!("Failed to write WAL record for commit {}", commit_id), e)
        })?;

        self.file.sync_all().map_err(|e| {
            WalError::fsync_failed(format!("fsync failed after WAL append for commit {}", commit_id), e)
        })?;

        self.last_commit = commit_id.value();
        Ok(serialized.len() as u64)
    }
}
