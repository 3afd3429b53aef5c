//! Fluent query builder and mutation gateway.

use crate::backend::Backend;
use crate::error::{CoreError, CoreResult};
use crate::predicate::{compare_values, Op, Predicate};
use flatdb_value::{Record, Value, ID_FIELD};
use std::sync::Arc;

/// Sort direction for the single ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

/// The accumulated query state: table, predicate conjunction, optional
/// ordering key.
///
/// A spec has no effect until a terminal operation runs; each terminal
/// call re-evaluates it against the backend's current state.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    /// Target table name.
    pub table: String,
    /// AND-only predicate list. Disjunctions are built by issuing
    /// multiple queries and merging client-side.
    pub predicates: Vec<Predicate>,
    /// Optional `(field, direction)` ordering; last `order` call wins.
    pub order: Option<(String, Direction)>,
}

impl QuerySpec {
    /// Fresh spec over a table: no predicates, no ordering.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            predicates: Vec::new(),
            order: None,
        }
    }

    /// True when the record satisfies the full predicate conjunction.
    ///
    /// The whole conjunction is evaluated per record; there is no
    /// short-circuit ordering guarantee callers may rely on.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }

    /// Stable-sorts records by the spec's ordering key, if one is set.
    ///
    /// Ties and records missing the key (which compares as null)
    /// preserve their pre-sort order.
    pub fn apply_order(&self, records: &mut [Record]) {
        let Some((field, direction)) = &self.order else {
            return;
        };
        records.sort_by(|a, b| {
            let left = a.get(field).unwrap_or(&Value::Null);
            let right = b.get(field).unwrap_or(&Value::Null);
            let ord = compare_values(left, right);
            match direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            }
        });
    }
}

/// A fluent query over one table.
///
/// Accumulates filters and an ordering key, then executes through one of
/// the terminal operations. Every terminal re-reads the backend's
/// current state: nothing is cached across calls, so a builder can be
/// reused, but two identical terminals may observe different data.
///
/// # Example
///
/// ```rust,ignore
/// let winners = db
///     .table("players")
///     .filter("score", Op::Gt, 100)
///     .order("score", Direction::Desc)
///     .all(Some(10))?;
/// ```
#[derive(Clone)]
pub struct Query {
    backend: Arc<dyn Backend>,
    spec: QuerySpec,
}

impl Query {
    pub(crate) fn new(backend: Arc<dyn Backend>, table: impl Into<String>) -> Self {
        Self {
            backend,
            spec: QuerySpec::new(table),
        }
    }

    /// Appends one filter condition; repeated calls AND together.
    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        self.spec.predicates.push(Predicate::new(field, op, value));
        self
    }

    /// Sets the ordering key and direction. A later call replaces an
    /// earlier one; there is no multi-key sort.
    #[must_use]
    pub fn order(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.spec.order = Some((field.into(), direction));
        self
    }

    /// Executes the query: filter, stable-sort if ordered, then cap to
    /// `limit` rows if given.
    ///
    /// Without an ordering key, results come back in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn all(&self, limit: Option<usize>) -> CoreResult<Vec<Record>> {
        let mut records = self.backend.scan(&self.spec.table)?;
        records.retain(|record| self.spec.matches(record));
        self.spec.apply_order(&mut records);
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    /// First element of the filtered, ordered result, or `None`.
    ///
    /// An empty result is a sentinel, never an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn first(&self) -> CoreResult<Option<Record>> {
        Ok(self.all(Some(1))?.into_iter().next())
    }

    /// Alias for [`first`](Self::first), matching the CRUD surface
    /// consumed by model code.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn get(&self) -> CoreResult<Option<Record>> {
        self.first()
    }

    /// Final element of the filtered result *in the requested order*,
    /// or `None`.
    ///
    /// This does not reverse the ordering: to get the maximum by a
    /// field, order by it ascending and take the last element. The name
    /// says exactly what is returned so the convention cannot be
    /// mistaken for a maximum operator.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn last_of_ordered(&self) -> CoreResult<Option<Record>> {
        Ok(self.all(None)?.pop())
    }

    /// Inserts a record, returning its store-assigned identifier.
    ///
    /// Accumulated filters play no part in an insert.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IdNotAssignable`] if the record carries an
    /// `id` field, or a backend error if persistence fails.
    pub fn insert(&self, record: Record) -> CoreResult<i64> {
        if record.contains(ID_FIELD) {
            return Err(CoreError::IdNotAssignable);
        }
        self.backend.insert(&self.spec.table, record)
    }

    /// Merges `patch` field-by-field into every matching record and
    /// returns how many were touched.
    ///
    /// Any `id` field in the patch is silently ignored; identifiers
    /// never change once assigned.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingFilter`] when no filter was set: an
    /// unfiltered update would rewrite the whole table.
    pub fn update(&self, patch: &Record) -> CoreResult<usize> {
        if self.spec.predicates.is_empty() {
            return Err(CoreError::missing_filter("update", &self.spec.table));
        }
        self.backend.update(&self.spec, patch)
    }

    /// Removes every matching record, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingFilter`] when no filter was set,
    /// under the same rule as [`update`](Self::update).
    pub fn delete(&self) -> CoreResult<usize> {
        if self.spec.predicates.is_empty() {
            return Err(CoreError::missing_filter("delete", &self.spec.table));
        }
        self.backend.delete(&self.spec)
    }

    /// Read access to the accumulated specification.
    #[must_use]
    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }
}
