//! Metrics registry
//!
//! - Counters only (no gauges, no histograms)
//! - Monotonic increase
//! - Reset only on process start
//! - Thread-safe but lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Metrics registry containing all operational counters
///
/// All counters use Relaxed atomics; a snapshot is exact per counter but
/// not a consistent cut across counters.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    wal_bytes_written: AtomicU64,
    wal_records_written: AtomicU64,
    ballots_cast: AtomicU64,
    ballots_rejected: AtomicU64,
    duplicate_attempts: AtomicU64,
    conflict_retries: AtomicU64,
    tallies_computed: AtomicU64,
    transitions: AtomicU64,
    admin_mutations: AtomicU64,
    audit_failures: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // WAL

    pub fn add_wal_bytes(&self, bytes: u64) {
        self.wal_bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn increment_wal_records(&self) {
        self.wal_records_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_wal_records(&self, records: u64) {
        self.wal_records_written.fetch_add(records, Ordering::Relaxed);
    }

    // Ballots

    pub fn increment_ballots_cast(&self) {
        self.ballots_cast.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_ballots_rejected(&self) {
        self.ballots_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// A voter tried to cast a second ballot in the same election
    pub fn increment_duplicate_attempts(&self) {
        self.duplicate_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_conflict_retries(&self) {
        self.conflict_retries.fetch_add(1, Ordering::Relaxed);
    }

    // Reads and administration

    pub fn increment_tallies(&self) {
        self.tallies_computed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_transitions(&self) {
        self.transitions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_admin_mutations(&self) {
        self.admin_mutations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_audit_failures(&self) {
        self.audit_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            wal_bytes: self.wal_bytes_written.load(Ordering::Relaxed),
            wal_records: self.wal_records_written.load(Ordering::Relaxed),
            ballots_cast: self.ballots_cast.load(Ordering::Relaxed),
            ballots_rejected: self.ballots_rejected.load(Ordering::Relaxed),
            duplicate_attempts: self.duplicate_attempts.load(Ordering::Relaxed),
            conflict_retries: self.conflict_retries.load(Ordering::Relaxed),
            tallies_computed: self.tallies_computed.load(Ordering::Relaxed),
            transitions: self.transitions.load(Ordering::Relaxed),
            admin_mutations: self.admin_mutations.load(Ordering::Relaxed),
            audit_failures: self.audit_failures.load(Ordering::Relaxed),
        }
    }

    /// Current values as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub wal_bytes: u64,
    pub wal_records: u64,
    pub ballots_cast: u64,
    pub ballots_rejected: u64,
    pub duplicate_attempts: u64,
    pub conflict_retries: u64,
    pub tallies_computed: u64,
    pub transitions: u64,
    pub admin_mutations: u64,
    pub audit_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        let snapshot = MetricsRegistry::new().snapshot();
        assert_eq!(snapshot.wal_bytes, 0);
        assert_eq!(snapshot.ballots_cast, 0);
        assert_eq!(snapshot.audit_failures, 0);
    }

    #[test]
    fn test_increment_counters() {
        let registry = MetricsRegistry::new();

        registry.add_wal_bytes(100);
        registry.add_wal_bytes(50);
        registry.increment_wal_records();
        registry.increment_ballots_cast();
        registry.increment_ballots_rejected();
        registry.increment_duplicate_attempts();
        registry.increment_transitions();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.wal_bytes, 150);
        assert_eq!(snapshot.wal_records, 1);
        assert_eq!(snapshot.ballots_cast, 1);
        assert_eq!(snapshot.ballots_rejected, 1);
        assert_eq!(snapshot.duplicate_attempts, 1);
        assert_eq!(snapshot.transitions, 1);
    }

    #[test]
    fn test_to_json() {
        let registry = MetricsRegistry::new();
        registry.add_wal_bytes(1234);
        registry.increment_tallies();

        let parsed: serde_json::Value = serde_json::from_str(&registry.to_json()).unwrap();
        assert_eq!(parsed["wal_bytes"], 1234);
        assert_eq!(parsed["tallies_computed"], 1);
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(MetricsRegistry::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let reg = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    reg.increment_ballots_cast();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.snapshot().ballots_cast, 1000);
    }
}
