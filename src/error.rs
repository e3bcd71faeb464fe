//! SNAPKV - Custom Error Types
//! Defines the error hierarchy for the transactional key-value store.

use std::fmt;

use thiserror::Error;

use crate::types::Key;

/// Custom Result type for the snapkv store.
pub type Result<T> = std::result::Result<T, SnapKvError>;

/// Why a commit was rejected during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// The key did not exist in the snapshot but was created since.
    CreatedByAnother,
    /// The key existed in the snapshot but is gone from the committed state.
    DeletedByAnother,
    /// The key was live in the snapshot and is live now, but was updated or
    /// recreated since.
    ModifiedByAnother,
}

/// A commit conflict on a single key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub key: Key,
    pub kind: ConflictKind,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ConflictKind::CreatedByAnother => {
                write!(f, "key {:?} was created by another transaction", self.key)
            }
            ConflictKind::DeletedByAnother => {
                write!(f, "key {:?} was deleted by another transaction", self.key)
            }
            ConflictKind::ModifiedByAnother => write!(
                f,
                "key {:?} was updated or recreated by another transaction",
                self.key
            ),
        }
    }
}

/// Error types for the snapkv store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapKvError {
    /// Operation on a transaction that was already committed or rolled back.
    #[error("Transaction is already closed")]
    TransactionClosed,

    /// Key rejected by the database key checker or the transaction filter.
    #[error("Invalid key: {0:?}")]
    InvalidKey(Key),

    /// No live entry for the key, range or nearest-key lookup.
    /// Also marks the end of a cursor.
    #[error("Key not found")]
    KeyNotFound,

    /// Commit validation failed; nothing was applied.
    #[error("Commit conflict: {0}")]
    Conflict(Conflict),
}

impl SnapKvError {
    /// Returns true for `KeyNotFound`, including cursor exhaustion.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SnapKvError::KeyNotFound)
    }

    /// Returns the conflict details if this is a commit conflict.
    pub fn conflict(&self) -> Option<&Conflict> {
        match self {
            SnapKvError::Conflict(c) => Some(c),
            _ => None,
        }
    }
}

impl From<Conflict> for SnapKvError {
    fn from(c: Conflict) -> Self {
        SnapKvError::Conflict(c)
    }
}
