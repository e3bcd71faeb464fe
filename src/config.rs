//! SNAPKV - Database Configuration
//! Defines the caller-supplied policy for a database instance.

use std::fmt;
use std::sync::Arc;

use crate::keys::KeyPredicate;

/// Configuration for a snapkv database.
#[derive(Clone, Default)]
pub struct Config {
    /// Key format checker applied on every `set` and `delete`.
    /// When `None`, any non-empty key is accepted.
    pub key_checker: Option<KeyPredicate>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("key_checker", &self.key_checker.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl Config {
    /// Create a Config that accepts every non-empty key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key format checker.
    pub fn with_key_checker<F>(mut self, checker: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.key_checker = Some(Arc::new(checker));
        self
    }

    /// Returns true if `key` is acceptable for writes.
    /// Empty keys are always rejected.
    pub fn accepts(&self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        match &self.key_checker {
            Some(checker) => checker(key),
            None => true,
        }
    }
}
