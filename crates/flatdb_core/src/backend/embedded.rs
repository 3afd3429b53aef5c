//! Embedded backend over the file-backed table store.

use crate::backend::Backend;
use crate::error::{CoreError, CoreResult};
use crate::guard::{CleanupRule, GuardRule, GuardViolation};
use crate::query::QuerySpec;
use flatdb_store::TableStore;
use flatdb_value::{Record, ID_FIELD};
use tracing::debug;

/// The embedded backend: linear scans over per-table JSON documents.
///
/// Every mutation runs as one load-modify-persist cycle inside the
/// store's per-table critical section; guarded deletes hold the locks of
/// every involved table for the whole check-then-act sequence, which
/// closes the window in which a record could become referenced between
/// the guard check and the delete.
pub struct EmbeddedBackend {
    store: TableStore,
}

impl EmbeddedBackend {
    /// Creates a backend over an opened table store.
    #[must_use]
    pub fn new(store: TableStore) -> Self {
        Self { store }
    }
}

impl Backend for EmbeddedBackend {
    fn scan(&self, table: &str) -> CoreResult<Vec<Record>> {
        Ok(self.store.load(table)?)
    }

    fn insert(&self, table: &str, mut record: Record) -> CoreResult<i64> {
        self.store.mutate(table, |records| {
            let id = TableStore::next_id_in(records);
            record.assign_id(id);
            records.push(record);
            Ok::<_, CoreError>(id)
        })
    }

    fn update(&self, spec: &QuerySpec, patch: &Record) -> CoreResult<usize> {
        self.store.mutate(&spec.table, |records| {
            let mut touched = 0;
            for record in records.iter_mut() {
                if spec.matches(record) {
                    record.merge(patch);
                    touched += 1;
                }
            }
            Ok::<_, CoreError>(touched)
        })
    }

    fn delete(&self, spec: &QuerySpec) -> CoreResult<usize> {
        self.store.mutate(&spec.table, |records| {
            let before = records.len();
            records.retain(|record| !spec.matches(record));
            Ok::<_, CoreError>(before - records.len())
        })
    }

    fn guard_delete(
        &self,
        table: &str,
        id: i64,
        guards: &[GuardRule],
        cleanups: &[CleanupRule],
    ) -> CoreResult<bool> {
        // Every involved table stays exclusively locked from the first
        // guard check to the last delete.
        let mut tables: Vec<&str> = vec![table];
        tables.extend(guards.iter().map(|g| g.table.as_str()));
        tables.extend(cleanups.iter().map(|c| c.table.as_str()));
        let _locks = self.store.lock_tables(&tables);

        let mut blockers = Vec::new();
        for guard in guards {
            let records = self.store.load(&guard.table)?;
            let count = guard.count_matches(&records);
            if count > 0 {
                blockers.push(GuardViolation {
                    label: guard.display_label().to_string(),
                    count,
                });
            }
        }
        if !blockers.is_empty() {
            debug!(table, id, blocked_by = blockers.len(), "guarded delete refused");
            return Err(CoreError::GuardBlocked { blockers });
        }

        for cleanup in cleanups {
            let mut records = self.store.load(&cleanup.table)?;
            let before = records.len();
            records.retain(|record| !cleanup.matches(record));
            if records.len() != before {
                self.store.persist(&cleanup.table, &records)?;
            }
        }

        let mut records = self.store.load(table)?;
        let before = records.len();
        records.retain(|record| record.get(ID_FIELD).and_then(|v| v.as_integer()) != Some(id));
        let existed = records.len() != before;
        if existed {
            self.store.persist(table, &records)?;
        }
        Ok(existed)
    }
}
