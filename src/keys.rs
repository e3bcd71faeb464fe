//! SNAPKV - Key Predicates
//! Predicates used as database key checkers and transaction filters.

use std::sync::Arc;

/// A shareable key predicate. Used both for the database key-format checker
/// and for per-transaction filters.
pub type KeyPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Accepts keys that are absolute, already-normalized slash-separated paths,
/// e.g. `/`, `/etc` or `/tmp/x/y`. Rejects `a/b`, `/a/`, `//a`, `/a/./b` and
/// `/a/../b`.
pub fn is_clean_abs(key: &str) -> bool {
    let Some(rest) = key.strip_prefix('/') else {
        return false;
    };
    if rest.is_empty() {
        return true;
    }
    rest.split('/')
        .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

/// Builds a transaction filter admitting only keys that start with `prefix`.
pub fn has_prefix(prefix: impl Into<String>) -> KeyPredicate {
    let prefix = prefix.into();
    Arc::new(move |key: &str| key.starts_with(prefix.as_str()))
}
