//! Dependency guarding for destructive deletes.
//!
//! Before a record is deleted, caller-supplied guard rules check other
//! collections for rows that still reference it. The sequence is
//! strictly two-phase: every guard rule is evaluated first, and only if
//! all of them report zero matches do the cleanup deletes and the target
//! delete run. A single blocking rule aborts the whole operation with
//! nothing deleted and no partial cleanup.
//!
//! Rules are built per call and discarded when it returns.

use crate::predicate::{Op, Predicate};
use flatdb_value::{Record, Value};
use std::fmt;

/// A dependency check run before allowing a delete.
///
/// If the rule's predicates match at least one record in `table`, the
/// delete is refused and the failure carries this rule's label (or the
/// table name when unlabeled) together with the match count.
#[derive(Debug, Clone)]
pub struct GuardRule {
    /// Referencing table to check.
    pub table: String,
    /// Conditions a referencing record must meet.
    pub predicates: Vec<Predicate>,
    /// Display label for user-facing messaging.
    pub label: Option<String>,
}

impl GuardRule {
    /// Creates a guard rule against the named table.
    #[must_use]
    pub fn on(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            predicates: Vec::new(),
            label: None,
        }
    }

    /// Adds one condition; repeated calls AND together.
    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::new(field, op, value));
        self
    }

    /// Sets the display label used in blocking reports.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label used when this rule blocks: explicit label or table name.
    #[must_use]
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.table)
    }

    /// Counts this rule's matches within a loaded record sequence.
    #[must_use]
    pub fn count_matches(&self, records: &[Record]) -> usize {
        records
            .iter()
            .filter(|record| self.predicates.iter().all(|p| p.matches(record)))
            .count()
    }
}

/// A cleanup delete run after all guards pass and before the target
/// record is removed.
#[derive(Debug, Clone)]
pub struct CleanupRule {
    /// Table to delete associated records from.
    pub table: String,
    /// Conditions selecting the records to remove.
    pub predicates: Vec<Predicate>,
}

impl CleanupRule {
    /// Creates a cleanup rule against the named table.
    #[must_use]
    pub fn on(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            predicates: Vec::new(),
        }
    }

    /// Adds one condition; repeated calls AND together.
    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::new(field, op, value));
        self
    }

    /// True for the records this rule removes.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }
}

/// One blocking guard rule in a refused delete: label plus match count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardViolation {
    /// The blocking rule's display label.
    pub label: String,
    /// How many referencing records matched.
    pub count: usize,
}

impl fmt::Display for GuardViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} record(s))", self.label, self.count)
    }
}
