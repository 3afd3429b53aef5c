//! Error types for flatdb core.

use crate::guard::GuardViolation;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in flatdb core operations.
///
/// `get`/`first`/`last_of_ordered` on an empty result are *not* errors:
/// they return `None`. Callers check the sentinel rather than catch.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Embedded store error (backing file exists but is unreadable,
    /// directory locked, I/O failure).
    #[error("storage error: {0}")]
    Storage(#[from] flatdb_store::StoreError),

    /// Update or delete attempted with zero predicates.
    ///
    /// Always surfaced, never downgraded to a no-op: a filterless
    /// mutation would touch every record in the table.
    #[error("{operation} on table '{table}' requires at least one filter")]
    MissingFilter {
        /// The refused operation, `update` or `delete`.
        operation: &'static str,
        /// The table that would have been rewritten wholesale.
        table: String,
    },

    /// Insert carried a caller-supplied `id` field.
    ///
    /// The store is the sole authority for identifiers.
    #[error("the 'id' field is assigned by the store and cannot be supplied on insert")]
    IdNotAssignable,

    /// An operator string did not parse.
    #[error("unknown operator: {op:?}")]
    UnknownOperator {
        /// The unrecognized operator text.
        op: String,
    },

    /// A table or field name cannot be used as a SQL identifier.
    #[error("invalid identifier: {name:?}")]
    InvalidIdentifier {
        /// The offending name.
        name: String,
    },

    /// The relational backend was selected at startup but is failing
    /// now. There is no automatic fallback to the embedded store.
    #[error("relational backend unavailable: {message}")]
    BackendUnavailable {
        /// Description of the failure.
        message: String,
    },

    /// Delete refused because dependency guard rules matched.
    #[error("delete blocked by {} dependency rule(s)", blockers.len())]
    GuardBlocked {
        /// Every blocking rule's label and match count, in rule order.
        blockers: Vec<GuardViolation>,
    },
}

impl CoreError {
    /// Creates a missing-filter error.
    pub fn missing_filter(operation: &'static str, table: impl Into<String>) -> Self {
        Self::MissingFilter {
            operation,
            table: table.into(),
        }
    }

    /// Creates an unknown-operator error.
    pub fn unknown_operator(op: impl Into<String>) -> Self {
        Self::UnknownOperator { op: op.into() }
    }

    /// Creates an invalid-identifier error.
    pub fn invalid_identifier(name: impl Into<String>) -> Self {
        Self::InvalidIdentifier { name: name.into() }
    }

    /// Creates a backend-unavailable error.
    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            message: message.into(),
        }
    }
}
