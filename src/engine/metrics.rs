//! SNAPKV - Engine Metrics & Observability
//! Atomic counters for transaction activity, updated lock-free from any
//! thread holding a `Database` handle or a `Transaction`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Atomic operation counters for a snapkv database.
///
/// All counters use `Ordering::Relaxed`; they are for observability only
/// and never used for synchronization.
#[derive(Debug)]
pub struct EngineMetrics {
    /// Transactions handed out by the database (filtered or not).
    pub transactions: AtomicU64,
    /// Successful commits.
    pub commits: AtomicU64,
    /// Commits rejected by validation.
    pub conflicts: AtomicU64,
    /// Explicit rollbacks.
    pub rollbacks: AtomicU64,
    /// Total number of `get` operations.
    pub gets: AtomicU64,
    /// Total number of `set` operations.
    pub sets: AtomicU64,
    /// Total number of `delete` operations.
    pub deletes: AtomicU64,
    /// Scans, ascends, descends and nearest-key lookups.
    pub range_queries: AtomicU64,
    /// Pairs written into the committed state by successful commits.
    pub pairs_committed: AtomicU64,
    started: Instant,
}

impl EngineMetrics {
    /// Create a new metrics instance with all counters at zero.
    pub fn new() -> Self {
        Self {
            transactions: AtomicU64::new(0),
            commits: AtomicU64::new(0),
            conflicts: AtomicU64::new(0),
            rollbacks: AtomicU64::new(0),
            gets: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
            range_queries: AtomicU64::new(0),
            pairs_committed: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn record_transaction(&self) {
        self.transactions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful commit that wrote `pairs` entries.
    pub fn record_commit(&self, pairs: usize) {
        self.commits.fetch_add(1, Ordering::Relaxed);
        self.pairs_committed
            .fetch_add(pairs as u64, Ordering::Relaxed);
    }

    pub fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_get(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_range_query(&self) {
        self.range_queries.fetch_add(1, Ordering::Relaxed);
    }

    /// Get database uptime in seconds.
    pub fn uptime_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Get total number of key operations (gets + sets + deletes + range queries).
    pub fn total_ops(&self) -> u64 {
        self.gets.load(Ordering::Relaxed)
            + self.sets.load(Ordering::Relaxed)
            + self.deletes.load(Ordering::Relaxed)
            + self.range_queries.load(Ordering::Relaxed)
    }

    /// Fraction of commit attempts that failed validation.
    pub fn conflict_rate(&self) -> f64 {
        let commits = self.commits.load(Ordering::Relaxed);
        let conflicts = self.conflicts.load(Ordering::Relaxed);
        let attempts = commits + conflicts;
        if attempts == 0 {
            return 0.0;
        }
        conflicts as f64 / attempts as f64
    }

    /// Format metrics as a human-readable report.
    pub fn report(&self) -> String {
        format!(
            "\n═══ SNAPKV Metrics ═══\n\
             Transactions:\n\
               begun:     {}\n\
               commits:   {}\n\
               conflicts: {}\n\
               rollbacks: {}\n\
               conflict rate: {:.2}\n\
             Operations:\n\
               gets:      {}\n\
               sets:      {}\n\
               deletes:   {}\n\
               ranges:    {}\n\
               total ops: {}\n\
             Committed pairs: {}\n\
             Uptime: {:.2}s",
            self.transactions.load(Ordering::Relaxed),
            self.commits.load(Ordering::Relaxed),
            self.conflicts.load(Ordering::Relaxed),
            self.rollbacks.load(Ordering::Relaxed),
            self.conflict_rate(),
            self.gets.load(Ordering::Relaxed),
            self.sets.load(Ordering::Relaxed),
            self.deletes.load(Ordering::Relaxed),
            self.range_queries.load(Ordering::Relaxed),
            self.total_ops(),
            self.pairs_committed.load(Ordering::Relaxed),
            self.uptime_secs(),
        )
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
