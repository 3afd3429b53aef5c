//! File-backed table store.

use crate::dir::DatabaseDir;
use crate::error::{StoreError, StoreResult};
use flatdb_value::Record;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::sync::Arc;
use tracing::debug;

/// Guard holding one table's exclusive mutation lock.
pub type TableLockGuard = ArcMutexGuard<RawMutex, ()>;

/// The embedded record store: one JSON document per named collection.
///
/// The store exclusively owns the persisted form of every collection in
/// its database directory. Reads go through [`TableStore::load`], which
/// always re-reads the current document; writes go through
/// [`TableStore::persist`], which replaces the whole document atomically.
///
/// # Concurrency
///
/// `next_id` recomputes the identifier from the loaded snapshot, so a
/// load-modify-persist cycle is only correct when no other writer runs
/// concurrently on the same table. [`TableStore::mutate`] provides that
/// critical section behind an in-process per-table lock; the advisory
/// directory lock in [`DatabaseDir`] excludes other processes.
pub struct TableStore {
    dir: DatabaseDir,
    /// Per-table mutation locks, created lazily on first use.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TableStore {
    /// Creates a store over an opened database directory.
    #[must_use]
    pub fn new(dir: DatabaseDir) -> Self {
        Self {
            dir,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Loads the full record sequence of a table.
    ///
    /// A missing document yields an empty sequence. Selecting a table
    /// that was never written to is not an error; only mutations create
    /// the document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unreadable`] if the document exists but
    /// cannot be read or parsed.
    pub fn load(&self, table: &str) -> StoreResult<Vec<Record>> {
        let path = self.dir.table_path(table)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Vec::new());
            }
            Err(err) => {
                return Err(StoreError::unreadable(table, err.to_string()));
            }
        };

        serde_json::from_slice(&bytes).map_err(|err| StoreError::unreadable(table, err.to_string()))
    }

    /// Persists the full record sequence of a table, replacing prior
    /// contents.
    ///
    /// The document is written to a sibling temp file and renamed over
    /// the live one, so a concurrent [`load`](Self::load) sees either
    /// the old document or the new one, never a partial write.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any file operation fails.
    pub fn persist(&self, table: &str, records: &[Record]) -> StoreResult<()> {
        let path = self.dir.table_path(table)?;
        let temp = self.dir.table_temp_path(table)?;

        let bytes = serde_json::to_vec_pretty(records)
            .map_err(|err| StoreError::unreadable(table, err.to_string()))?;

        let mut file = File::create(&temp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp, &path)?;
        debug!(table, records = records.len(), "persisted table document");
        Ok(())
    }

    /// Computes the next identifier for a table: one greater than the
    /// maximum existing `id`, or 1 for an empty collection.
    ///
    /// Recomputed on every call from the current document; there is no
    /// persisted counter. Only meaningful inside a mutation critical
    /// section.
    ///
    /// # Errors
    ///
    /// Returns an error if the table document cannot be loaded.
    pub fn next_id(&self, table: &str) -> StoreResult<i64> {
        Ok(Self::next_id_in(&self.load(table)?))
    }

    /// Computes the next identifier from an already-loaded sequence.
    #[must_use]
    pub fn next_id_in(records: &[Record]) -> i64 {
        records.iter().filter_map(Record::id).max().unwrap_or(0) + 1
    }

    /// Runs one load-modify-persist cycle under the table's exclusive
    /// mutation lock.
    ///
    /// The closure receives the current record sequence and mutates it
    /// in place; on success the sequence is persisted before the lock is
    /// released. If the closure fails, nothing is written.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or a store error from load/persist.
    pub fn mutate<T, E>(
        &self,
        table: &str,
        f: impl FnOnce(&mut Vec<Record>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let lock = self.lock_for(table);
        let _guard = lock.lock();

        let mut records = self.load(table)?;
        let outcome = f(&mut records)?;
        self.persist(table, &records)?;
        Ok(outcome)
    }

    /// Acquires the mutation locks of several tables at once.
    ///
    /// Locks are taken in sorted-name order so that overlapping
    /// multi-table critical sections cannot deadlock. The guards keep
    /// all tables exclusively locked until dropped; combine with
    /// [`load`](Self::load)/[`persist`](Self::persist) for cross-table
    /// sequences such as guarded deletes.
    #[must_use]
    pub fn lock_tables(&self, tables: &[&str]) -> Vec<TableLockGuard> {
        let mut names: Vec<&str> = tables.to_vec();
        names.sort_unstable();
        names.dedup();
        names
            .into_iter()
            .map(|table| self.lock_for(table).lock_arc())
            .collect()
    }

    fn lock_for(&self, table: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(
            locks
                .entry(table.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}

impl std::fmt::Debug for TableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableStore")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatdb_value::Value;
    use tempfile::TempDir;

    fn store() -> (TempDir, TableStore) {
        let tmp = TempDir::new().unwrap();
        let dir = DatabaseDir::open(tmp.path(), true).unwrap();
        (tmp, TableStore::new(dir))
    }

    fn named(name: &str, id: i64) -> Record {
        let mut record = Record::new().with("name", name);
        record.assign_id(id);
        record
    }

    #[test]
    fn missing_table_loads_empty() {
        let (_tmp, store) = store();
        assert_eq!(store.load("ghost").unwrap(), Vec::new());
    }

    #[test]
    fn persist_then_load_round_trips() {
        let (_tmp, store) = store();
        let records = vec![named("A", 1), named("B", 2)];
        store.persist("users", &records).unwrap();
        assert_eq!(store.load("users").unwrap(), records);
    }

    #[test]
    fn corrupt_document_is_unreadable_not_empty() {
        let (tmp, store) = store();
        fs::write(tmp.path().join("users.json"), b"{ not json").unwrap();
        let err = store.load("users").unwrap_err();
        assert!(matches!(err, StoreError::Unreadable { .. }));
    }

    #[test]
    fn persist_leaves_no_temp_file() {
        let (tmp, store) = store();
        store.persist("users", &[named("A", 1)]).unwrap();
        assert!(tmp.path().join("users.json").exists());
        assert!(!tmp.path().join("users.json.tmp").exists());
    }

    #[test]
    fn next_id_counts_from_max_not_len() {
        let (_tmp, store) = store();
        assert_eq!(store.next_id("users").unwrap(), 1);

        store.persist("users", &[named("A", 1), named("B", 7)]).unwrap();
        assert_eq!(store.next_id("users").unwrap(), 8);

        // Deleting the high record reuses its id; documented behavior of
        // max-plus-one allocation.
        store.persist("users", &[named("A", 1)]).unwrap();
        assert_eq!(store.next_id("users").unwrap(), 2);
    }

    #[test]
    fn mutate_persists_on_success() {
        let (_tmp, store) = store();
        let id = store
            .mutate::<_, StoreError>("users", |records| {
                let mut record = Record::new().with("name", "A");
                let id = TableStore::next_id_in(records);
                record.assign_id(id);
                records.push(record);
                Ok(id)
            })
            .unwrap();

        assert_eq!(id, 1);
        assert_eq!(store.load("users").unwrap().len(), 1);
    }

    #[test]
    fn mutate_skips_persist_on_error() {
        let (_tmp, store) = store();
        store.persist("users", &[named("A", 1)]).unwrap();

        let result: Result<(), StoreError> = store.mutate("users", |records| {
            records.clear();
            Err(StoreError::unreadable("users", "synthetic"))
        });
        assert!(result.is_err());
        assert_eq!(store.load("users").unwrap().len(), 1);
    }

    #[test]
    fn serial_mutations_allocate_dense_ids() {
        let (_tmp, store) = store();
        for n in 1..=5i64 {
            let id = store
                .mutate::<_, StoreError>("users", |records| {
                    let mut record = Record::new().with("n", Value::Integer(n));
                    let id = TableStore::next_id_in(records);
                    record.assign_id(id);
                    records.push(record);
                    Ok(id)
                })
                .unwrap();
            assert_eq!(id, n);
        }
    }

    #[test]
    fn lock_tables_sorts_and_dedups() {
        let (_tmp, store) = store();
        let guards = store.lock_tables(&["b", "a", "b"]);
        assert_eq!(guards.len(), 2);
    }
}
