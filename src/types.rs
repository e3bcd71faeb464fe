//! SNAPKV - Core Type Definitions
//! Defines the key/value aliases and the timestamped `Pair` record.

use std::sync::atomic::{AtomicU64, Ordering};

/// Key type for the store. Keys are ordered bytewise.
pub type Key = String;

/// Value type for the store.
pub type Value = String;

/// Nanoseconds since the Unix epoch. Zero is never handed out.
pub type Timestamp = u64;

static LAST_TIMESTAMP: AtomicU64 = AtomicU64::new(0);

/// Returns the current wall-clock time in nanoseconds, forced to be strictly
/// greater than any timestamp previously returned in this process.
pub fn now() -> Timestamp {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    // u64 nanoseconds overflow in 2554; saturate past that.
    let wall = u64::try_from(nanos).unwrap_or(u64::MAX);

    let mut last = LAST_TIMESTAMP.load(Ordering::Relaxed);
    loop {
        let next = wall.max(last.saturating_add(1));
        match LAST_TIMESTAMP.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
        {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// Lifecycle state of a `Pair`, carrying its own timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairState {
    /// Freshly created; modification time equals creation time.
    New { ctime: Timestamp },
    /// Modified after creation; `mtime > ctime`.
    Updated { ctime: Timestamp, mtime: Timestamp },
    /// Deleted inside a transaction, or committed as a deletion.
    Deleted { ctime: Timestamp },
    /// Normalized deletion marker, one tick before `ctime`.
    Tomb { ctime: Timestamp },
}

impl PairState {
    pub fn ctime(&self) -> Timestamp {
        match *self {
            PairState::New { ctime }
            | PairState::Updated { ctime, .. }
            | PairState::Deleted { ctime }
            | PairState::Tomb { ctime } => ctime,
        }
    }

    /// Modification time; `None` for a pending deletion.
    pub fn mtime(&self) -> Option<Timestamp> {
        match *self {
            PairState::New { ctime } => Some(ctime),
            PairState::Updated { mtime, .. } => Some(mtime),
            PairState::Deleted { .. } => None,
            PairState::Tomb { ctime } => Some(ctime.saturating_sub(1)),
        }
    }
}

/// A single key/value entry with its lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub key: Key,
    pub value: Value,
    pub state: PairState,
}

impl Pair {
    /// Create a brand-new live pair stamped with the current time.
    pub fn new(key: impl Into<Key>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            state: PairState::New { ctime: now() },
        }
    }

    /// Create a normalized deletion marker for `key`.
    pub fn tomb(key: impl Into<Key>) -> Self {
        Self {
            key: key.into(),
            value: Value::new(),
            state: PairState::Tomb { ctime: now() },
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self.state, PairState::New { .. })
    }

    pub fn is_tomb(&self) -> bool {
        matches!(self.state, PairState::Tomb { .. })
    }

    /// True for both pending deletions and tombs.
    pub fn is_deleted(&self) -> bool {
        matches!(self.state, PairState::Deleted { .. } | PairState::Tomb { .. })
    }

    /// Replace the value and bump the modification time.
    pub(crate) fn update(&mut self, value: Value) {
        let ctime = self.state.ctime();
        self.value = value;
        self.state = PairState::Updated { ctime, mtime: now() };
    }

    /// Mark the pair deleted, keeping its creation time.
    pub(crate) fn mark_deleted(&mut self) {
        self.state = PairState::Deleted {
            ctime: self.state.ctime(),
        };
    }

    /// Re-stamp the pair as of the commit instant `at`, preserving its class.
    /// Deletions drop their value.
    pub fn with_commit_time(&self, at: Timestamp) -> Pair {
        let (value, state) = match self.state {
            PairState::Tomb { .. } => (Value::new(), PairState::Tomb { ctime: at }),
            PairState::Deleted { .. } => (Value::new(), PairState::Deleted { ctime: at }),
            PairState::New { .. } => (self.value.clone(), PairState::New { ctime: at }),
            PairState::Updated { ctime, .. } => {
                (self.value.clone(), PairState::Updated { ctime, mtime: at })
            }
        };
        Pair {
            key: self.key.clone(),
            value,
            state,
        }
    }
}
