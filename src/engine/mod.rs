//! SNAPKV - Storage Engine Module
//! The `Database` owns the committed state and validates commits; the
//! submodules provide the map, transactions, queries and cursors.

pub mod cursor;
pub mod map;
pub mod metrics;
pub mod query;
pub mod transaction;

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Config;
use crate::error::{Conflict, ConflictKind, Result};
use crate::keys::KeyPredicate;
use crate::types::{self, Pair};

use self::map::OrderedMap;
use self::metrics::EngineMetrics;
use self::transaction::Transaction;

struct Shared {
    /// The single authoritative committed state.
    committed: RwLock<OrderedMap>,
    config: Config,
    metrics: EngineMetrics,
}

/// In-memory key-value database with optimistic, snapshot-isolated
/// transactions.
///
/// `Database` is a cheap handle; clones share the same committed state and
/// can be sent to other threads.
///
/// ## Concurrency Model
/// - `new_transaction` takes the **read lock** just long enough to clone the
///   committed map into the transaction's private snapshot
/// - `Transaction::commit` takes the **write lock** for validation and apply
/// - Transactions never lock each other; conflicts are found at commit time
///   and the first committer wins
/// - A successful commit updates the committed map in place under the write
///   lock, only after every accessed key has validated. Snapshots are deep
///   copies, so no transaction ever observes a partially applied commit
///
/// ## Example
/// ```
/// use snapkv::Database;
///
/// let db = Database::new();
/// let mut tx = db.new_transaction();
/// tx.set("/greeting", "hello").unwrap();
/// tx.commit().unwrap();
///
/// let mut tx = db.new_transaction();
/// assert_eq!(tx.get("/greeting").unwrap(), "hello");
/// ```
#[derive(Clone)]
pub struct Database {
    inner: Arc<Shared>,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("entries", &self.inner.committed.read().len())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl Database {
    /// Create an empty database accepting any non-empty key.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create an empty database with the given configuration.
    pub fn with_config(config: Config) -> Self {
        log::info!(
            "snapkv database created (key checker: {})",
            if config.key_checker.is_some() { "custom" } else { "none" }
        );
        Self {
            inner: Arc::new(Shared {
                committed: RwLock::new(OrderedMap::new()),
                config,
                metrics: EngineMetrics::new(),
            }),
        }
    }

    /// Begin a read-write transaction on a snapshot of the current state.
    pub fn new_transaction(&self) -> Transaction {
        self.begin(None)
    }

    /// Begin a transaction restricted to keys admitted by `filter`.
    /// Other keys fail with `InvalidKey` on get/set/delete and are invisible
    /// to scans, ranges and nearest-key lookups.
    pub fn new_filtered_transaction(&self, filter: KeyPredicate) -> Transaction {
        self.begin(Some(filter))
    }

    fn begin(&self, filter: Option<KeyPredicate>) -> Transaction {
        let snapshot = self.inner.committed.read().clone();
        self.inner.metrics.record_transaction();
        log::debug!(
            "begin transaction: {} entries in snapshot, filtered: {}",
            snapshot.len(),
            filter.is_some()
        );
        Transaction::new(self.clone(), snapshot, filter)
    }

    /// Returns true if `key` passes the configured key format checker.
    /// Empty keys never pass.
    pub fn check_key(&self, key: &str) -> bool {
        self.inner.config.accepts(key)
    }

    /// Number of live keys in the committed state.
    pub fn len(&self) -> usize {
        self.inner.committed.read().live_len()
    }

    /// Returns true if the committed state has no live keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.inner.metrics
    }

    /// Validate every key accessed by `tx` against the committed state and,
    /// if none conflicts, apply the changed pairs stamped with one commit
    /// time. On conflict nothing is applied.
    pub(crate) fn try_commit(&self, tx: &Transaction) -> Result<()> {
        let mut committed = self.inner.committed.write();
        let at = types::now();

        let mut changed = Vec::new();
        for pair in tx.accessed() {
            let snap = tx.snapshot().get(&pair.key);
            let curr = committed.get(&pair.key);
            match validate(pair, snap, curr) {
                Ok(true) => changed.push(pair),
                Ok(false) => {}
                Err(conflict) => {
                    log::warn!("commit aborted: {}", conflict);
                    self.inner.metrics.record_conflict();
                    return Err(conflict.into());
                }
            }
        }

        let count = changed.len();
        for pair in changed {
            committed.upsert(pair.with_commit_time(at));
        }
        self.inner.metrics.record_commit(count);
        log::debug!(
            "commit: {} accessed keys validated, {} written",
            tx.accessed().len(),
            count
        );
        Ok(())
    }
}

/// Compare the snapshot and current versions of an accessed key.
///
/// Tombstones count as absent: a key is classified by whether it is live in
/// the snapshot and in the committed state. Returns `Ok(true)` when the
/// accessed pair must be written, `Ok(false)` when the committed state
/// already matches it.
fn validate(
    accessed: &Pair,
    snapshot: Option<&Pair>,
    current: Option<&Pair>,
) -> std::result::Result<bool, Conflict> {
    let conflict = |kind| Conflict {
        key: accessed.key.clone(),
        kind,
    };
    let snapshot = snapshot.filter(|p| !p.is_deleted());
    let live = current.filter(|p| !p.is_deleted());
    match (snapshot, live) {
        (None, None) => Ok(true),
        (None, Some(_)) => Err(conflict(ConflictKind::CreatedByAnother)),
        // Two deletions of the same key agree on the outcome.
        (Some(_), None) if accessed.is_deleted() => Ok(false),
        (Some(_), None) => Err(conflict(ConflictKind::DeletedByAnother)),
        (Some(snap), Some(curr)) if snap != curr => Err(conflict(ConflictKind::ModifiedByAnother)),
        (Some(_), Some(curr)) => Ok(curr != accessed),
    }
}
