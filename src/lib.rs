//! SNAPKV - In-Memory Transactional Key-Value Store
//!
//! An embedded, ordered string key-value store with snapshot-isolated,
//! optimistically validated transactions.
//!
//! ## Features
//! - **Snapshots**: every transaction works on a private copy of the committed state
//! - **Optimistic Commits**: all keys read, written or iterated are revalidated at commit;
//!   the first committer wins and a conflicting commit applies nothing
//! - **Tombstones**: deletions are kept as pair states so "deleted" and "never existed" differ
//! - **Ordered Queries**: ascending/descending ranges, scans and nearest-key lookups
//! - **Key Policies**: pluggable key format checker and per-transaction key filters
//! - **Metrics**: lock-free atomic counters for observability
//!
//! ## Example
//! ```
//! use snapkv::{keys, Config, Database};
//!
//! let db = Database::with_config(Config::new().with_key_checker(keys::is_clean_abs));
//!
//! let mut tx = db.new_transaction();
//! tx.set("/a", "1").unwrap();
//! tx.set("/b", "2").unwrap();
//! tx.commit().unwrap();
//!
//! let mut tx = db.new_transaction();
//! let keys: Vec<String> = tx.ascend("", "").unwrap().map(|(k, _)| k).collect();
//! assert_eq!(keys, vec!["/a", "/b"]);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod keys;
pub mod types;

pub use config::Config;
pub use engine::cursor::{Cursor, Direction};
pub use engine::query::KvPair;
pub use engine::transaction::Transaction;
pub use engine::Database;
pub use error::{Conflict, ConflictKind, Result, SnapKvError};
pub use types::{Key, Pair, PairState, Value};
