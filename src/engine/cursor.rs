//! SNAPKV - Transaction Cursor
//! Lazy, transaction-bound iteration over a resolved range of the live view.

use std::fmt;
use std::ops::Range;

use crate::error::{Result, SnapKvError};

use super::query::KvPair;
use super::transaction::Transaction;

/// Traversal order of a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Cursor over a materialized range of live pairs.
///
/// Each pair is folded into the transaction's accessed set when it is
/// yielded, so only keys the caller actually consumed take part in commit
/// validation. Exhaustion is reported as `SnapKvError::KeyNotFound`.
///
/// Two consumption styles are offered over the same sequence: pull with
/// `next_pair` (or the `Iterator` impl), or push with `visit`.
pub struct Cursor<'tx> {
    tx: &'tx mut Transaction,
    kvs: Vec<KvPair>,
    remaining: Range<usize>,
    direction: Direction,
}

impl<'tx> Cursor<'tx> {
    pub(crate) fn new(
        tx: &'tx mut Transaction,
        kvs: Vec<KvPair>,
        range: Range<usize>,
        direction: Direction,
    ) -> Self {
        Self {
            tx,
            kvs,
            remaining: range,
            direction,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Number of pairs not yet yielded.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// Yield the next pair, or `KeyNotFound` once the range is exhausted.
    pub fn next_pair(&mut self) -> Result<KvPair> {
        let index = match self.direction {
            Direction::Ascending => self.remaining.next(),
            Direction::Descending => self.remaining.next_back(),
        }
        .ok_or(SnapKvError::KeyNotFound)?;

        let (key, value) = std::mem::take(&mut self.kvs[index]);
        self.tx.touch(&key);
        Ok((key, value))
    }

    /// Invoke `f` once per remaining pair, in cursor order. Stops at and
    /// returns the first error produced by `f`.
    pub fn visit<F, E>(mut self, mut f: F) -> std::result::Result<(), E>
    where
        F: FnMut(&str, &str) -> std::result::Result<(), E>,
    {
        while let Ok((key, value)) = self.next_pair() {
            f(&key, &value)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("direction", &self.direction)
            .field("remaining", &self.remaining.len())
            .finish()
    }
}

impl Iterator for Cursor<'_> {
    type Item = KvPair;

    fn next(&mut self) -> Option<KvPair> {
        self.next_pair().ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining.len();
        (n, Some(n))
    }
}
