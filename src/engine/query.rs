//! SNAPKV - Range and Nearest-Key Resolution
//! Builds a transaction's live view and resolves range bounds and nearest
//! keys over it with binary search. Everything here is a pure function over
//! sorted data; cursors and conflict tracking live elsewhere.

use std::cmp::Ordering;
use std::ops::Range;

use crate::keys::KeyPredicate;
use crate::types::{Key, Value};

use super::map::OrderedMap;

/// A live key/value pair as returned by queries.
pub type KvPair = (Key, Value);

/// Merge `accessed` over `snapshot`, dropping deleted pairs and keys the
/// filter rejects. The result is sorted by key.
pub fn live_view(
    accessed: &OrderedMap,
    snapshot: &OrderedMap,
    filter: Option<&KeyPredicate>,
) -> Vec<KvPair> {
    let mut out = Vec::with_capacity(snapshot.len().max(accessed.len()));
    let mut overlay = accessed.iter().peekable();
    let mut base = snapshot.iter().peekable();

    loop {
        let pair = match (overlay.peek(), base.peek()) {
            (None, None) => break,
            (Some(_), None) => overlay.next(),
            (None, Some(_)) => base.next(),
            (Some(a), Some(b)) => match a.key.cmp(&b.key) {
                Ordering::Less => overlay.next(),
                Ordering::Greater => base.next(),
                Ordering::Equal => {
                    base.next();
                    overlay.next()
                }
            },
        };
        let Some(pair) = pair else { break };
        if pair.is_deleted() {
            continue;
        }
        if filter.map_or(true, |admit| admit(pair.key.as_str())) {
            out.push((pair.key.clone(), pair.value.clone()));
        }
    }
    out
}

/// Index of the first key `>= key`.
fn lower_bound(kvs: &[KvPair], key: &str) -> usize {
    kvs.partition_point(|(k, _)| k.as_str() < key)
}

/// Index of the first key `> key`.
fn upper_bound(kvs: &[KvPair], key: &str) -> usize {
    kvs.partition_point(|(k, _)| k.as_str() <= key)
}

/// Resolve an ascending range `[from, to)` over `kvs`.
///
/// Empty bounds are unbounded. Non-empty bounds given in the wrong order are
/// swapped. Equal non-empty bounds yield an empty range. Returns `None` when
/// the resolved range holds no keys.
pub fn ascend_range(kvs: &[KvPair], from: &str, to: &str) -> Option<Range<usize>> {
    if !from.is_empty() && from == to {
        let at = lower_bound(kvs, from);
        return Some(at..at);
    }
    let (from, to) = if !from.is_empty() && !to.is_empty() && from > to {
        (to, from)
    } else {
        (from, to)
    };

    let start = if from.is_empty() { 0 } else { lower_bound(kvs, from) };
    let end = if to.is_empty() { kvs.len() } else { lower_bound(kvs, to) };
    (start < end).then_some(start..end)
}

/// Resolve a descending range `(to, from]` over `kvs`. The returned range is
/// in index order; callers walk it from the back.
///
/// `from` is the inclusive upper bound and `to` the exclusive lower bound.
/// Same rules as `ascend_range` for empty, swapped and equal bounds.
pub fn descend_range(kvs: &[KvPair], from: &str, to: &str) -> Option<Range<usize>> {
    if !from.is_empty() && from == to {
        let at = upper_bound(kvs, from);
        return Some(at..at);
    }
    let (from, to) = if !from.is_empty() && !to.is_empty() && from < to {
        (to, from)
    } else {
        (from, to)
    };

    let end = if from.is_empty() { kvs.len() } else { upper_bound(kvs, from) };
    let start = if to.is_empty() { 0 } else { upper_bound(kvs, to) };
    (start < end).then_some(start..end)
}

/// Index of the smallest key `>= key`.
pub fn find_ge(kvs: &[KvPair], key: &str) -> Option<usize> {
    let i = lower_bound(kvs, key);
    (i < kvs.len()).then_some(i)
}

/// Index of the smallest key `> key`.
pub fn find_gt(kvs: &[KvPair], key: &str) -> Option<usize> {
    let i = upper_bound(kvs, key);
    (i < kvs.len()).then_some(i)
}

/// Index of the largest key `<= key`.
pub fn find_le(kvs: &[KvPair], key: &str) -> Option<usize> {
    upper_bound(kvs, key).checked_sub(1)
}
