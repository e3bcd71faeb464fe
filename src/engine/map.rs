//! SNAPKV - Ordered Map
//! Key-sorted vector of pairs. Holds both the committed state and each
//! transaction's snapshot and accessed set.

use crate::types::Pair;

/// Sorted, duplicate-free sequence of pairs, tombstones included.
/// Entries are never removed; a deletion is a pair state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedMap {
    pairs: Vec<Pair>,
}

impl OrderedMap {
    /// Create a new, empty map.
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Returns the number of entries, tombstones included.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Returns the number of entries that are not deleted.
    pub fn live_len(&self) -> usize {
        self.pairs.iter().filter(|p| !p.is_deleted()).count()
    }

    /// Binary search for `key`. `Ok(i)` is the position of the pair,
    /// `Err(i)` the position where it would be inserted.
    pub fn index(&self, key: &str) -> Result<usize, usize> {
        self.pairs.binary_search_by(|p| p.key.as_str().cmp(key))
    }

    /// Get the pair for `key`, tombstones included.
    pub fn get(&self, key: &str) -> Option<&Pair> {
        self.index(key).ok().map(|i| &self.pairs[i])
    }

    /// Check if the map holds an entry for `key` (including tombstones).
    pub fn contains_key(&self, key: &str) -> bool {
        self.index(key).is_ok()
    }

    /// Replace the pair with the same key, or insert it in order.
    pub fn upsert(&mut self, pair: Pair) {
        match self.index(&pair.key) {
            Ok(i) => self.pairs[i] = pair,
            Err(i) => self.pairs.insert(i, pair),
        }
    }

    /// Iterate all pairs in key order.
    pub fn iter(&self) -> std::slice::Iter<'_, Pair> {
        self.pairs.iter()
    }
}

impl<'a> IntoIterator for &'a OrderedMap {
    type Item = &'a Pair;
    type IntoIter = std::slice::Iter<'a, Pair>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.iter()
    }
}
