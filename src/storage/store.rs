//! Transactional ballot store
//!
//! # Commit protocol
//!
//! Commits are serialized by the writer lock. Inside it:
//!
//! 1. The transaction body runs against head state and stages mutations
//! 2. The staged batch is validated against every constraint
//! 3. The batch is appended to the WAL and fsynced
//! 4. The batch is applied to the tables under a brief write lock
//! 5. The commit identity is published to readers
//!
//! A failure before step 3 leaves no trace. A WAL failure at step 3
//! halts the store: every later commit fails until it is reopened.
//!
//! # Reads
//!
//! A `Snapshot` captures the last published commit identity as its
//! `ReadView`. Each lookup takes the table read lock only for that lookup
//! and filters versions by the view, so a snapshot never observes part of
//! a commit and never holds up the writer for longer than one lookup.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard};

use serde::Serialize;

use crate::mvcc::{CommitAuthority, CommitId, ReadView};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::recovery::{RecoveryError, RecoveryResult, ReplayStats, StorageApply, WalReplayer};
use crate::schema::{
    Candidate, CandidateId, Election, ElectionId, ParticipationRecord, Position, PositionId,
    VerificationCode, Vote, VoterId,
};
use crate::wal::{wal_path, WalReader, WalWriter};

use super::errors::{StorageError, StorageResult};
use super::mutation::{encode_batch, Mutation};
use super::tables::Tables;

struct WriterState {
    authority: CommitAuthority,
    wal: Option<WalWriter>,
    halted: bool,
}

/// Size of the store, derived from committed state and the WAL.
///
/// Unlike the metrics counters these figures are the same in every process
/// that opens the data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub last_commit: u64,
    pub wal_records: u64,
    pub wal_bytes: u64,
    pub elections: u64,
    pub ballots_recorded: u64,
    pub votes_recorded: u64,
}

/// The ballot store.
pub struct Store {
    tables: RwLock<Tables>,
    writer: Mutex<WriterState>,
    published: AtomicU64,
    metrics: Arc<MetricsRegistry>,
}

impl Store {
    /// Creates an empty store with no WAL. Nothing survives the process.
    pub fn in_memory() -> Self {
        Self::from_parts(Tables::new(), CommitAuthority::new(), None)
    }

    /// Opens the store in `data_dir`, replaying `<data_dir>/wal/wal.log`.
    ///
    /// Any WAL corruption or replay failure fails the open.
    pub fn open(data_dir: &Path) -> StorageResult<Self> {
        let dir = data_dir.display().to_string();
        log_event_with_fields(Event::WalReplayBegin, &[("data_dir", &dir)]);

        let mut target = ReplayTarget {
            tables: Tables::new(),
            authority: CommitAuthority::new(),
        };

        let path = wal_path(data_dir);
        let mut recovered = ReplayStats::default();
        if path.exists() {
            let replayed = WalReader::open(&path)
                .map_err(|e| RecoveryError::wal_corruption(0, e.to_string()))
                .and_then(|mut reader| WalReplayer::replay(&mut reader, &mut target));
            match replayed {
                Ok(stats) => {
                    let commits = stats.commits_replayed.to_string();
                    let mutations = stats.mutations_replayed.to_string();
                    let offset = stats.final_offset.to_string();
                    log_event_with_fields(
                        Event::WalReplayComplete,
                        &[
                            ("commits", &commits),
                            ("mutations", &mutations),
                            ("final_offset", &offset),
                        ],
                    );
                    recovered = stats;
                }
                Err(e) => {
                    let reason = e.to_string();
                    log_event_with_fields(Event::RecoveryFailed, &[("reason", &reason)]);
                    return Err(StorageError::recovery(e));
                }
            }
        } else {
            log_event_with_fields(Event::WalReplayComplete, &[("commits", "0")]);
        }

        let wal = WalWriter::open(data_dir).map_err(StorageError::wal)?;
        let store = Self::from_parts(target.tables, target.authority, Some(wal));
        store.metrics.add_wal_bytes(recovered.final_offset);
        store.metrics.add_wal_records(recovered.commits_replayed);

        let last = store.last_commit().to_string();
        log_event_with_fields(Event::StoreOpened, &[("data_dir", &dir), ("last_commit", &last)]);
        Ok(store)
    }

    fn from_parts(tables: Tables, authority: CommitAuthority, wal: Option<WalWriter>) -> Self {
        let published = authority.current_snapshot().upper_bound().value();
        Self {
            tables: RwLock::new(tables),
            writer: Mutex::new(WriterState {
                authority,
                wal,
                halted: false,
            }),
            published: AtomicU64::new(published),
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    /// Store size at the latest commit. WAL figures cover what was
    /// replayed at open plus what was appended since.
    pub fn stats(&self) -> StoreStats {
        let snapshot = self.snapshot();
        let metrics = self.metrics.snapshot();
        StoreStats {
            last_commit: snapshot.commit_id().value(),
            wal_records: metrics.wal_records,
            wal_bytes: metrics.wal_bytes,
            elections: snapshot.elections().len() as u64,
            ballots_recorded: snapshot.total_participation(),
            votes_recorded: snapshot.total_votes(),
        }
    }

    /// Counters this store reports WAL activity to.
    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Whether the store is backed by a WAL.
    pub fn is_durable(&self) -> bool {
        self.writer
            .lock()
            .map(|w| w.wal.is_some())
            .unwrap_or(false)
    }

    /// Whether an earlier WAL failure halted the store.
    pub fn is_halted(&self) -> bool {
        self.writer.lock().map(|w| w.halted).unwrap_or(true)
    }

    /// Highest commit identity visible to new snapshots.
    pub fn last_commit(&self) -> CommitId {
        CommitId::new(self.published.load(Ordering::Acquire))
    }

    /// Captures a read view at the last published commit.
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            store: self,
            view: ReadView::new(self.last_commit()),
        }
    }

    /// Captures a read view at an earlier commit.
    ///
    /// Views above the last published commit are clamped to it.
    pub fn snapshot_at(&self, commit_id: CommitId) -> Snapshot<'_> {
        Snapshot {
            store: self,
            view: ReadView::new(commit_id.min(self.last_commit())),
        }
    }

    fn read_tables(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `body` as one atomic transaction.
    ///
    /// The body reads head state and stages mutations. Its staged writes
    /// are not visible to its own reads. If the body returns `Err`, or
    /// the batch violates a constraint, nothing is written. A body that
    /// stages nothing commits nothing.
    pub fn transact<T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, E>,
        E: From<StorageError>,
    {
        let mut guard = self
            .writer
            .lock()
            .map_err(|_| StorageError::lock_poisoned("writer"))?;
        let writer = &mut *guard;

        if writer.halted {
            return Err(StorageError::halted().into());
        }

        let view = writer.authority.current_snapshot();
        let (value, batch) = {
            let tables = self.read_tables();
            let mut txn = Transaction {
                tables: &tables,
                view,
                staged: Vec::new(),
            };
            let value = body(&mut txn)?;
            let batch = txn.staged;

            if let Err(violation) = tables.validate(&batch) {
                log_event_with_fields(
                    Event::StoreCommitRejected,
                    &[("constraint", violation.constraint), ("detail", &violation.detail)],
                );
                return Err(StorageError::constraint(violation).into());
            }
            (value, batch)
        };

        if batch.is_empty() {
            return Ok(value);
        }

        let commit_id = writer.authority.next_commit_id();

        if let Some(wal) = writer.wal.as_mut() {
            let payload = encode_batch(&batch).map_err(|e| StorageError::codec(e.to_string()))?;
            match wal.append(commit_id, payload) {
                Ok(bytes) => {
                    self.metrics.add_wal_bytes(bytes);
                    self.metrics.increment_wal_records();
                }
                Err(e) => {
                    writer.halted = true;
                    let reason = e.to_string();
                    let commit = commit_id.to_string();
                    log_event_with_fields(
                        Event::WalAppendFailed,
                        &[("commit_id", &commit), ("reason", &reason)],
                    );
                    log_event_with_fields(Event::StoreHalted, &[("reason", &reason)]);
                    return Err(StorageError::wal(e).into());
                }
            }
        }

        let mutations = batch.len().to_string();
        {
            let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
            tables.apply(commit_id, batch);
        }

        if let Err(e) = writer.authority.mark_committed(commit_id) {
            writer.halted = true;
            log_event_with_fields(Event::StoreHalted, &[("reason", &e.to_string())]);
            return Err(StorageError::halted().into());
        }
        self.published.store(commit_id.value(), Ordering::Release);

        let commit = commit_id.to_string();
        log_event_with_fields(
            Event::StoreCommit,
            &[("commit_id", &commit), ("mutations", &mutations)],
        );
        Ok(value)
    }
}

/// Replay sink that rebuilds tables and the commit authority.
struct ReplayTarget {
    tables: Tables,
    authority: CommitAuthority,
}

impl StorageApply for ReplayTarget {
    fn apply_batch(&mut self, commit_id: CommitId, batch: Vec<Mutation>) -> RecoveryResult<()> {
        self.tables
            .validate(&batch)
            .map_err(|v| RecoveryError::constraint(commit_id.value(), v.to_string()))?;
        self.authority
            .observe_replayed_commit(commit_id)
            .map_err(|e| RecoveryError::commit_order(commit_id.value(), e.to_string()))?;
        self.tables.apply(commit_id, batch);
        Ok(())
    }
}

/// An open transaction: head-state reads plus a staged batch.
pub struct Transaction<'a> {
    tables: &'a Tables,
    view: ReadView,
    staged: Vec<Mutation>,
}

impl<'a> Transaction<'a> {
    /// The view every read in this transaction uses: all committed state.
    pub fn view(&self) -> ReadView {
        self.view
    }

    /// Stages a mutation for commit.
    pub fn stage(&mut self, mutation: Mutation) {
        self.staged.push(mutation);
    }

    /// Mutations staged so far.
    pub fn staged(&self) -> &[Mutation] {
        &self.staged
    }

    pub fn election(&self, id: &ElectionId) -> Option<&'a Election> {
        self.tables.election(id, self.view)
    }

    pub fn elections(&self) -> Vec<&'a Election> {
        self.tables.elections(self.view)
    }

    pub fn position(&self, id: &PositionId) -> Option<&'a Position> {
        self.tables.position(id, self.view)
    }

    pub fn positions_of(&self, election_id: &ElectionId) -> Vec<&'a Position> {
        self.tables.positions_of(election_id, self.view)
    }

    pub fn candidate(&self, id: &CandidateId) -> Option<&'a Candidate> {
        self.tables.candidate(id, self.view)
    }

    pub fn candidates_of(&self, position_id: &PositionId) -> Vec<&'a Candidate> {
        self.tables.candidates_of(position_id, self.view)
    }

    pub fn participation_for(
        &self,
        voter_id: &VoterId,
        election_id: &ElectionId,
    ) -> Option<&'a ParticipationRecord> {
        self.tables.participation_for(voter_id, election_id, self.view)
    }

    /// True once the voter has cast a ballot in the election, even if the
    /// participation record was later purged.
    pub fn has_participated(&self, voter_id: &VoterId, election_id: &ElectionId) -> bool {
        self.tables.has_participated(voter_id, election_id, self.view)
    }

    pub fn participation_of_voter(&self, voter_id: &VoterId) -> Vec<&'a ParticipationRecord> {
        self.tables.participation_of_voter(voter_id, self.view)
    }
}

/// A consistent read-only view of committed state.
///
/// Rows are returned by value; no lock outlives a single call.
#[derive(Clone, Copy)]
pub struct Snapshot<'a> {
    store: &'a Store,
    view: ReadView,
}

impl<'a> Snapshot<'a> {
    pub fn view(&self) -> ReadView {
        self.view
    }

    /// The commit this snapshot reflects.
    pub fn commit_id(&self) -> CommitId {
        self.view.upper_bound()
    }

    pub fn election(&self, id: &ElectionId) -> Option<Election> {
        self.store.read_tables().election(id, self.view).cloned()
    }

    pub fn elections(&self) -> Vec<Election> {
        self.store
            .read_tables()
            .elections(self.view)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn position(&self, id: &PositionId) -> Option<Position> {
        self.store.read_tables().position(id, self.view).cloned()
    }

    pub fn positions_of(&self, election_id: &ElectionId) -> Vec<Position> {
        self.store
            .read_tables()
            .positions_of(election_id, self.view)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn candidate(&self, id: &CandidateId) -> Option<Candidate> {
        self.store.read_tables().candidate(id, self.view).cloned()
    }

    pub fn candidates_of(&self, position_id: &PositionId) -> Vec<Candidate> {
        self.store
            .read_tables()
            .candidates_of(position_id, self.view)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn vote_count(&self, candidate_id: &CandidateId) -> u64 {
        self.store.read_tables().vote_count(candidate_id, self.view)
    }

    pub fn votes_of(&self, candidate_id: &CandidateId) -> Vec<Vote> {
        self.store
            .read_tables()
            .votes_of(candidate_id, self.view)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn total_votes(&self) -> u64 {
        self.store.read_tables().total_votes(self.view)
    }

    pub fn participation_for(
        &self,
        voter_id: &VoterId,
        election_id: &ElectionId,
    ) -> Option<ParticipationRecord> {
        self.store
            .read_tables()
            .participation_for(voter_id, election_id, self.view)
            .cloned()
    }

    /// Live participation records across every election.
    pub fn total_participation(&self) -> u64 {
        self.store.read_tables().total_participation(self.view)
    }

    pub fn has_participated(&self, voter_id: &VoterId, election_id: &ElectionId) -> bool {
        self.store
            .read_tables()
            .has_participated(voter_id, election_id, self.view)
    }

    pub fn participation_by_code(&self, code: &VerificationCode) -> Option<ParticipationRecord> {
        self.store
            .read_tables()
            .participation_by_code(code, self.view)
            .cloned()
    }

    pub fn participation_count(&self, election_id: &ElectionId) -> u64 {
        self.store
            .read_tables()
            .participation_count(election_id, self.view)
    }

    pub fn participation_of_voter(&self, voter_id: &VoterId) -> Vec<ParticipationRecord> {
        self.store
            .read_tables()
            .participation_of_voter(voter_id, self.view)
            .into_iter()
            .cloned()
            .collect()
    }
}
