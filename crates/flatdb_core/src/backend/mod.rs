//! Physical backends behind the query layer.
//!
//! The [`Backend`] trait is the single seam between the query grammar
//! and physical storage. Both implementations run the same in-process
//! predicate evaluator over a full scan, so a query means exactly the
//! same thing whichever backend is active; the relational backend only
//! differs in how values are represented at rest (see
//! [`SqliteBackend`]'s coercion notes).

mod coerce;
mod embedded;
mod sqlite;

pub use embedded::EmbeddedBackend;
pub use sqlite::SqliteBackend;

use crate::error::CoreResult;
use crate::guard::{CleanupRule, GuardRule};
use crate::query::QuerySpec;
use flatdb_value::Record;

/// A physical storage backend.
///
/// # Invariants
///
/// - `scan` returns the collection's current records in insertion order;
///   a table that was never written to is an empty collection, not an
///   error
/// - `insert` allocates the identifier (max existing `id` + 1, or 1)
///   and returns it; callers have already rejected client-supplied ids
/// - `update` merges field-by-field and never changes `id`
/// - `guard_delete` is two-phase: all guard checks complete before any
///   cleanup or target delete runs, and a blocking guard aborts with
///   nothing written
/// - each mutation is one atomic load-modify-persist critical section
///   (per-table locks for the embedded store, a transaction for SQLite)
pub trait Backend: Send + Sync {
    /// Returns the full current record sequence of a table.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing resource exists but cannot be
    /// read.
    fn scan(&self, table: &str) -> CoreResult<Vec<Record>>;

    /// Inserts a record, allocating and returning its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if persistence fails.
    fn insert(&self, table: &str, record: Record) -> CoreResult<i64>;

    /// Merges `patch` into every record matching `spec`, returning the
    /// matched count.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read or written.
    fn update(&self, spec: &QuerySpec, patch: &Record) -> CoreResult<usize>;

    /// Removes every record matching `spec`, returning the removed
    /// count.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read or written.
    fn delete(&self, spec: &QuerySpec) -> CoreResult<usize>;

    /// Guarded delete of the record with identifier `id` in `table`.
    ///
    /// Returns whether the target record existed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::GuardBlocked`] when any guard rule
    /// matches, with every blocking rule's label and count; or a
    /// read/write error.
    fn guard_delete(
        &self,
        table: &str,
        id: i64,
        guards: &[GuardRule],
        cleanups: &[CleanupRule],
    ) -> CoreResult<bool>;
}
