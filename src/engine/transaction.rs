//! SNAPKV - Transactions
//! A transaction owns a frozen snapshot of the committed state and an
//! accessed set recording every key it read or wrote. Nothing it does is
//! visible to anyone else until `commit` succeeds.

use std::fmt;

use crate::error::{Result, SnapKvError};
use crate::keys::KeyPredicate;
use crate::types::{Pair, Value};

use super::cursor::{Cursor, Direction};
use super::map::OrderedMap;
use super::query::{self, KvPair};
use super::Database;

/// A snapshot-isolated, optimistically validated transaction.
///
/// Created by [`Database::new_transaction`] or
/// [`Database::new_filtered_transaction`]. After `commit` or `rollback`
/// every operation fails with `SnapKvError::TransactionClosed`.
pub struct Transaction {
    /// Owning database; `None` once the transaction is closed.
    db: Option<Database>,
    snapshot: OrderedMap,
    accessed: OrderedMap,
    filter: Option<KeyPredicate>,
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("open", &self.is_open())
            .field("snapshot_len", &self.snapshot.len())
            .field("accessed_len", &self.accessed.len())
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

impl Transaction {
    pub(crate) fn new(db: Database, snapshot: OrderedMap, filter: Option<KeyPredicate>) -> Self {
        Self {
            db: Some(db),
            snapshot,
            accessed: OrderedMap::new(),
            filter,
        }
    }

    /// Returns true until the transaction is committed or rolled back.
    pub fn is_open(&self) -> bool {
        self.db.is_some()
    }

    /// Number of keys this transaction has read or written so far.
    pub fn accessed_len(&self) -> usize {
        self.accessed.len()
    }

    pub(crate) fn snapshot(&self) -> &OrderedMap {
        &self.snapshot
    }

    pub(crate) fn accessed(&self) -> &OrderedMap {
        &self.accessed
    }

    fn database(&self) -> Result<&Database> {
        self.db.as_ref().ok_or(SnapKvError::TransactionClosed)
    }

    fn admits(&self, key: &str) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(key))
    }

    /// The pair visible to this transaction for `key`, tombstones included.
    fn visible(&self, key: &str) -> Option<&Pair> {
        self.accessed.get(key).or_else(|| self.snapshot.get(key))
    }

    /// Preconditions shared by `set` and `delete`.
    fn check_writable(&self, key: &str) -> Result<()> {
        let db = self.database()?;
        if !db.check_key(key) || !self.admits(key) {
            return Err(SnapKvError::InvalidKey(key.to_string()));
        }
        Ok(())
    }

    /// Get the value for `key`. A successful read joins the accessed set.
    pub fn get(&mut self, key: &str) -> Result<Value> {
        self.database()?.metrics().record_get();
        if !self.admits(key) {
            return Err(SnapKvError::InvalidKey(key.to_string()));
        }

        let pair = match self.visible(key) {
            Some(pair) if !pair.is_deleted() => pair.clone(),
            _ => return Err(SnapKvError::KeyNotFound),
        };
        let value = pair.value.clone();
        self.accessed.upsert(pair);
        Ok(value)
    }

    /// Set `key` to `value`. A missing or deleted key is created anew;
    /// an existing one is updated in place.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.check_writable(key)?;
        self.database()?.metrics().record_set();

        let value = value.into();
        let pair = match self.visible(key) {
            Some(existing) if !existing.is_deleted() => {
                let mut pair = existing.clone();
                pair.update(value);
                pair
            }
            _ => Pair::new(key, value),
        };
        self.accessed.upsert(pair);
        Ok(())
    }

    /// Delete `key`. Deleting a missing or already deleted key fails with
    /// `KeyNotFound` and is not recorded as an access.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        self.check_writable(key)?;
        self.database()?.metrics().record_delete();

        let mut pair = match self.visible(key) {
            Some(pair) if !pair.is_deleted() => pair.clone(),
            _ => return Err(SnapKvError::KeyNotFound),
        };
        pair.mark_deleted();
        self.accessed.upsert(pair);
        Ok(())
    }

    /// Validate and apply this transaction. The transaction is closed
    /// whether or not the commit succeeds.
    pub fn commit(&mut self) -> Result<()> {
        let db = self.db.take().ok_or(SnapKvError::TransactionClosed)?;
        db.try_commit(self)
    }

    /// Drop all buffered changes and the snapshot, and close the transaction.
    pub fn rollback(&mut self) -> Result<()> {
        let db = self.db.take().ok_or(SnapKvError::TransactionClosed)?;
        log::debug!("rollback: dropping {} accessed keys", self.accessed.len());
        db.metrics().record_rollback();
        self.accessed = OrderedMap::new();
        self.snapshot = OrderedMap::new();
        Ok(())
    }

    /// Record a snapshot key as accessed, unless already present.
    /// Keys created by this transaction are already in the accessed set.
    pub(crate) fn touch(&mut self, key: &str) {
        if self.accessed.contains_key(key) {
            return;
        }
        if let Some(pair) = self.snapshot.get(key) {
            let pair = pair.clone();
            self.accessed.upsert(pair);
        }
    }

    fn live_view(&self) -> Vec<KvPair> {
        query::live_view(&self.accessed, &self.snapshot, self.filter.as_ref())
    }

    /// Touch the pair at `index` of `kvs` and return it.
    fn take_found(&mut self, mut kvs: Vec<KvPair>, index: Option<usize>) -> Result<KvPair> {
        let index = index.ok_or(SnapKvError::KeyNotFound)?;
        let pair = kvs.swap_remove(index);
        self.touch(&pair.0);
        Ok(pair)
    }

    /// Cursor over every live pair. The order is unspecified.
    pub fn scan(&mut self) -> Result<Cursor<'_>> {
        self.database()?.metrics().record_range_query();
        let kvs = self.live_view();
        let range = 0..kvs.len();
        Ok(Cursor::new(self, kvs, range, Direction::Ascending))
    }

    /// Ascending cursor over `[from, to)`; an empty bound is unbounded.
    /// Fails with `KeyNotFound` when the range has no live keys.
    pub fn ascend(&mut self, from: &str, to: &str) -> Result<Cursor<'_>> {
        self.database()?.metrics().record_range_query();
        let kvs = self.live_view();
        let range = query::ascend_range(&kvs, from, to).ok_or(SnapKvError::KeyNotFound)?;
        Ok(Cursor::new(self, kvs, range, Direction::Ascending))
    }

    /// Descending cursor over `(to, from]`; an empty bound is unbounded.
    /// Fails with `KeyNotFound` when the range has no live keys.
    pub fn descend(&mut self, from: &str, to: &str) -> Result<Cursor<'_>> {
        self.database()?.metrics().record_range_query();
        let kvs = self.live_view();
        let range = query::descend_range(&kvs, from, to).ok_or(SnapKvError::KeyNotFound)?;
        Ok(Cursor::new(self, kvs, range, Direction::Descending))
    }

    /// Callback form of [`Transaction::scan`]. An empty database is not an error.
    pub fn scan_with<F>(&mut self, f: F) -> Result<()>
    where
        F: FnMut(&str, &str) -> Result<()>,
    {
        self.scan()?.visit(f)
    }

    /// Callback form of [`Transaction::ascend`].
    pub fn ascend_with<F>(&mut self, from: &str, to: &str, f: F) -> Result<()>
    where
        F: FnMut(&str, &str) -> Result<()>,
    {
        self.ascend(from, to)?.visit(f)
    }

    /// Callback form of [`Transaction::descend`].
    pub fn descend_with<F>(&mut self, from: &str, to: &str, f: F) -> Result<()>
    where
        F: FnMut(&str, &str) -> Result<()>,
    {
        self.descend(from, to)?.visit(f)
    }

    /// Smallest live key `>= key`.
    pub fn find_ge(&mut self, key: &str) -> Result<KvPair> {
        self.database()?.metrics().record_range_query();
        let kvs = self.live_view();
        let index = query::find_ge(&kvs, key);
        self.take_found(kvs, index)
    }

    /// Smallest live key `> key`.
    pub fn find_gt(&mut self, key: &str) -> Result<KvPair> {
        self.database()?.metrics().record_range_query();
        let kvs = self.live_view();
        let index = query::find_gt(&kvs, key);
        self.take_found(kvs, index)
    }

    /// Largest live key `<= key`.
    pub fn find_le(&mut self, key: &str) -> Result<KvPair> {
        self.database()?.metrics().record_range_query();
        let kvs = self.live_view();
        let index = query::find_le(&kvs, key);
        self.take_found(kvs, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::keys::{has_prefix, is_clean_abs};

    fn digits_db() -> Database {
        let db = Database::new();
        let mut tx = db.new_transaction();
        for d in 1..=9 {
            let k = d.to_string();
            tx.set(&k, k.clone()).unwrap();
        }
        tx.commit().unwrap();
        db
    }

    fn collect(cursor: Cursor<'_>) -> Vec<String> {
        cursor.map(|(k, _)| k).collect()
    }

    #[test]
    fn test_get_set_delete_within_transaction() {
        let db = Database::new();
        let mut tx = db.new_transaction();

        assert_eq!(tx.get("a"), Err(SnapKvError::KeyNotFound));
        tx.set("a", "1").unwrap();
        assert_eq!(tx.get("a").unwrap(), "1");
        tx.set("a", "2").unwrap();
        assert_eq!(tx.get("a").unwrap(), "2");
        tx.delete("a").unwrap();
        assert_eq!(tx.get("a"), Err(SnapKvError::KeyNotFound));
        assert_eq!(tx.delete("a"), Err(SnapKvError::KeyNotFound));

        // a deleted key is reborn as a new pair
        tx.set("a", "3").unwrap();
        assert!(tx.accessed().get("a").unwrap().is_new());
    }

    #[test]
    fn test_update_of_committed_key_is_updated_state() {
        let db = digits_db();
        let mut tx = db.new_transaction();
        tx.set("5", "five").unwrap();
        let pair = tx.accessed().get("5").unwrap();
        assert!(!pair.is_new());
        assert_eq!(pair.state.ctime(), tx.snapshot().get("5").unwrap().state.ctime());
    }

    #[test]
    fn test_missing_delete_is_not_an_access() {
        let db = Database::new();
        let mut tx = db.new_transaction();
        assert_eq!(tx.delete("nope"), Err(SnapKvError::KeyNotFound));
        assert_eq!(tx.get("nope"), Err(SnapKvError::KeyNotFound));
        assert_eq!(tx.accessed_len(), 0);
    }

    #[test]
    fn test_reads_join_accessed_set() {
        let db = digits_db();
        let mut tx = db.new_transaction();
        tx.get("3").unwrap();
        assert_eq!(tx.accessed_len(), 1);
        tx.find_ge("55").unwrap();
        assert_eq!(tx.accessed_len(), 2);
        assert!(tx.accessed().contains_key("6"));
    }

    #[test]
    fn test_cursor_touches_lazily() {
        let db = digits_db();
        let mut tx = db.new_transaction();
        {
            let mut cursor = tx.ascend("", "").unwrap();
            assert_eq!(cursor.remaining(), 9);
            assert_eq!(cursor.next_pair().unwrap().0, "1");
            assert_eq!(cursor.next_pair().unwrap().0, "2");
        }
        assert_eq!(tx.accessed_len(), 2);
    }

    #[test]
    fn test_cursor_exhaustion_is_not_found() {
        let db = digits_db();
        let mut tx = db.new_transaction();
        let mut cursor = tx.ascend("9", "").unwrap();
        assert_eq!(cursor.next_pair().unwrap().0, "9");
        assert_eq!(cursor.next_pair(), Err(SnapKvError::KeyNotFound));
        assert_eq!(cursor.next_pair(), Err(SnapKvError::KeyNotFound));
    }

    #[test]
    fn test_ascend_ranges() {
        let db = digits_db();
        let mut tx = db.new_transaction();
        assert_eq!(collect(tx.ascend("2", "5").unwrap()), vec!["2", "3", "4"]);
        assert_eq!(collect(tx.ascend("", "3").unwrap()), vec!["1", "2"]);
        assert_eq!(collect(tx.ascend("7", "").unwrap()), vec!["7", "8", "9"]);
        assert_eq!(collect(tx.ascend("5", "5").unwrap()), Vec::<String>::new());
        assert!(tx.ascend("55", "6").unwrap_err().is_not_found());
    }

    #[test]
    fn test_descend_ranges() {
        let db = digits_db();
        let mut tx = db.new_transaction();
        assert_eq!(collect(tx.descend("5", "2").unwrap()), vec!["5", "4", "3"]);
        assert_eq!(collect(tx.descend("3", "").unwrap()), vec!["3", "2", "1"]);
        assert_eq!(collect(tx.descend("", "7").unwrap()), vec!["9", "8"]);
        assert_eq!(collect(tx.descend("4", "4").unwrap()), Vec::<String>::new());
        assert!(tx.descend("0", "").unwrap_err().is_not_found());
    }

    #[test]
    fn test_callback_stops_on_error() {
        let db = digits_db();
        let mut tx = db.new_transaction();
        let mut seen = Vec::new();
        let result = tx.ascend_with("", "", |k, _| {
            if k == "4" {
                return Err(SnapKvError::InvalidKey(k.to_string()));
            }
            seen.push(k.to_string());
            Ok(())
        });
        assert_eq!(result, Err(SnapKvError::InvalidKey("4".into())));
        assert_eq!(seen, vec!["1", "2", "3"]);
        // the key handed to the failing callback was still touched
        assert_eq!(tx.accessed_len(), 4);
    }

    #[test]
    fn test_iterate_with_deletions_and_updates() {
        let db = digits_db();
        let mut tx = db.new_transaction();
        tx.delete("5").unwrap();
        tx.set("55", "55").unwrap();
        tx.set("3", "33").unwrap();

        let mut seen = Vec::new();
        tx.ascend_with("", "", |k, v| {
            seen.push((k.to_string(), v.to_string()));
            Ok(())
        })
        .unwrap();

        assert!(!seen.iter().any(|(k, _)| k == "5"));
        assert!(seen.contains(&("55".to_string(), "55".to_string())));
        assert!(seen.contains(&("3".to_string(), "33".to_string())));
        assert_eq!(seen.len(), 9);
    }

    #[test]
    fn test_scan_visits_every_live_key() {
        let db = digits_db();
        let mut tx = db.new_transaction();
        tx.delete("1").unwrap();
        let mut count = 0;
        tx.scan_with(|_, _| {
            count += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(count, 8);
        assert_eq!(tx.accessed_len(), 9);
    }

    #[test]
    fn test_scan_of_empty_database() {
        let db = Database::new();
        let mut tx = db.new_transaction();
        assert_eq!(tx.scan().unwrap().count(), 0);
        assert!(tx.ascend("", "").unwrap_err().is_not_found());
    }

    #[test]
    fn test_find_le_sees_uncommitted_writes() {
        let db = digits_db();
        let mut tx = db.new_transaction();
        for d in 0..=9 {
            let k = format!("{d}{d}");
            tx.set(&k, k.clone()).unwrap();
        }

        assert!(tx.find_le("0").unwrap_err().is_not_found());
        assert_eq!(tx.find_le("00").unwrap().0, "00");
        assert_eq!(tx.find_le("000").unwrap().0, "00");
        assert_eq!(tx.find_le("45").unwrap().0, "44");
        assert_eq!(tx.find_le("999").unwrap().0, "99");
        assert_eq!(tx.find_le("99").unwrap().0, "99");
        assert_eq!(tx.find_le("98").unwrap().0, "9");
    }

    #[test]
    fn test_find_ge_and_gt() {
        let db = digits_db();
        let mut tx = db.new_transaction();
        assert_eq!(tx.find_ge("6").unwrap(), ("6".to_string(), "6".to_string()));
        assert_eq!(tx.find_ge("55").unwrap().0, "6");
        assert_eq!(tx.find_ge("0").unwrap().0, "1");
        assert_eq!(tx.find_ge("9").unwrap().0, "9");
        assert!(tx.find_ge("99").unwrap_err().is_not_found());

        assert_eq!(tx.find_gt("6").unwrap().0, "7");
        assert!(tx.find_gt("9").unwrap_err().is_not_found());
    }

    #[test]
    fn test_find_skips_deleted_keys() {
        let db = digits_db();
        let mut tx = db.new_transaction();
        tx.delete("6").unwrap();
        assert_eq!(tx.find_ge("55").unwrap().0, "7");
        assert_eq!(tx.find_le("65").unwrap().0, "5");
    }

    #[test]
    fn test_closed_transaction_rejects_everything() {
        let db = digits_db();
        let mut tx = db.new_transaction();
        tx.rollback().unwrap();
        assert!(!tx.is_open());

        assert_eq!(tx.get("1"), Err(SnapKvError::TransactionClosed));
        assert_eq!(tx.set("1", "x"), Err(SnapKvError::TransactionClosed));
        assert_eq!(tx.delete("1"), Err(SnapKvError::TransactionClosed));
        assert!(matches!(tx.ascend("", ""), Err(SnapKvError::TransactionClosed)));
        assert!(matches!(tx.find_ge("1"), Err(SnapKvError::TransactionClosed)));
        assert_eq!(tx.commit(), Err(SnapKvError::TransactionClosed));
        assert_eq!(tx.rollback(), Err(SnapKvError::TransactionClosed));
    }

    #[test]
    fn test_rollback_discards_changes() {
        let db = digits_db();
        let mut tx = db.new_transaction();
        tx.set("1", "changed").unwrap();
        tx.delete("2").unwrap();
        tx.rollback().unwrap();
        assert_eq!(tx.accessed_len(), 0);
        assert!(tx.snapshot().is_empty());

        let mut check = db.new_transaction();
        assert_eq!(check.get("1").unwrap(), "1");
        assert_eq!(check.get("2").unwrap(), "2");
    }

    #[test]
    fn test_key_checker_rejects_writes() {
        let db = Database::with_config(Config::new().with_key_checker(is_clean_abs));
        let mut tx = db.new_transaction();
        assert_eq!(tx.set("relative", "x"), Err(SnapKvError::InvalidKey("relative".into())));
        assert_eq!(tx.set("", "x"), Err(SnapKvError::InvalidKey(String::new())));
        assert_eq!(tx.delete("/a/"), Err(SnapKvError::InvalidKey("/a/".into())));
        tx.set("/a", "x").unwrap();
        // reads are not subject to the key checker
        assert_eq!(tx.get("relative"), Err(SnapKvError::KeyNotFound));
    }

    #[test]
    fn test_filtered_transaction() {
        let db = Database::new();
        let mut tx = db.new_transaction();
        for k in ["/etc/hosts", "/tmp/a", "/tmp/b", "/usr/bin"] {
            tx.set(k, k).unwrap();
        }
        tx.commit().unwrap();

        let mut tx = db.new_filtered_transaction(has_prefix("/tmp/"));
        assert_eq!(tx.get("/etc/hosts"), Err(SnapKvError::InvalidKey("/etc/hosts".into())));
        assert_eq!(tx.set("/usr/x", "x"), Err(SnapKvError::InvalidKey("/usr/x".into())));
        assert_eq!(tx.delete("/usr/bin"), Err(SnapKvError::InvalidKey("/usr/bin".into())));
        assert_eq!(tx.get("/tmp/a").unwrap(), "/tmp/a");

        assert_eq!(collect(tx.ascend("", "").unwrap()), vec!["/tmp/a", "/tmp/b"]);
        assert_eq!(tx.find_le("/tmp/0").unwrap_err(), SnapKvError::KeyNotFound);
        assert_eq!(tx.find_gt("/tmp/b").unwrap_err(), SnapKvError::KeyNotFound);
    }
}
