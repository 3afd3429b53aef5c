//! Database facade and backend selection.

use crate::backend::{Backend, EmbeddedBackend, SqliteBackend};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::guard::{CleanupRule, GuardRule};
use crate::query::Query;
use flatdb_store::{DatabaseDir, TableStore};
use std::sync::Arc;
use tracing::{debug, warn};

/// The main database handle.
///
/// `Database` is the primary entry point. Opening it selects the
/// physical backend exactly once for the process lifetime; everything
/// after that goes through the one query surface, whichever backend is
/// active.
///
/// # Opening a database
///
/// ```rust,ignore
/// use flatdb_core::{Config, Database, Direction, Op, Record};
///
/// let db = Database::open(Config::new("data"))?;
///
/// let id = db.table("players").insert(Record::new().with("score", 10))?;
/// let top = db
///     .table("players")
///     .filter("score", Op::Gt, 5)
///     .order("score", Direction::Desc)
///     .all(Some(10))?;
/// ```
///
/// # Backend selection
///
/// With [`Config::relational`] set, the SQLite backend is used if the
/// connection attempt succeeds; on failure the embedded file store is
/// selected instead, and that choice is final — a relational backend
/// that degrades later surfaces `BackendUnavailable`, it is never
/// swapped out mid-process.
pub struct Database {
    backend: Arc<dyn Backend>,
}

impl Database {
    /// Opens a database, performing one-time backend selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded data directory cannot be opened
    /// or is locked by another process.
    pub fn open(config: Config) -> CoreResult<Self> {
        if let Some(relational) = &config.relational {
            match SqliteBackend::open(&relational.path, relational.connect_timeout) {
                Ok(backend) => {
                    debug!(path = %relational.path.display(), "selected relational backend");
                    return Ok(Self::with_backend(Arc::new(backend)));
                }
                Err(err) => {
                    warn!(error = %err, "relational backend unreachable, using embedded store");
                }
            }
        }

        let dir = DatabaseDir::open(&config.data_dir, config.create_if_missing)?;
        debug!(path = %config.data_dir.display(), "selected embedded backend");
        Ok(Self::with_backend(Arc::new(EmbeddedBackend::new(
            TableStore::new(dir),
        ))))
    }

    /// Wraps an already-constructed backend.
    #[must_use]
    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Starts a fresh query over a table.
    ///
    /// Selecting a table that does not exist yet is not an error; it
    /// reads as an empty collection until the first insert creates it.
    #[must_use]
    pub fn table(&self, name: impl Into<String>) -> Query {
        Query::new(Arc::clone(&self.backend), name)
    }

    /// Deletes the record with identifier `id` from `table`, guarded by
    /// dependency checks.
    ///
    /// All guard rules are evaluated first; if any matches, the call
    /// fails with [`CoreError::GuardBlocked`] listing every blocking
    /// rule, and nothing — cleanup included — has run. Only when all
    /// guards report zero matches do the cleanup deletes and the target
    /// delete execute. Returns whether the target record existed.
    ///
    /// # Errors
    ///
    /// Returns `GuardBlocked` as above, [`CoreError::MissingFilter`]
    /// for a cleanup rule with no predicates, or a backend error.
    pub fn guard_delete(
        &self,
        table: &str,
        id: i64,
        guards: &[GuardRule],
        cleanups: &[CleanupRule],
    ) -> CoreResult<bool> {
        // An unfiltered cleanup would wipe its whole table; refuse it
        // before any guard runs.
        for cleanup in cleanups {
            if cleanup.predicates.is_empty() {
                return Err(CoreError::missing_filter("delete", &cleanup.table));
            }
        }
        self.backend.guard_delete(table, id, guards, cleanups)
    }
}
