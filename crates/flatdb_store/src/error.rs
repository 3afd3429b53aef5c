//! Error types for store operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during embedded store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The table file exists but cannot be read or parsed.
    ///
    /// A *missing* table file is an empty collection and never raises
    /// this; only a present-but-unreadable document does.
    #[error("table '{table}' is unreadable: {message}")]
    Unreadable {
        /// Name of the table whose document failed to load.
        table: String,
        /// Description of the failure.
        message: String,
    },

    /// The database directory is locked by another process.
    #[error("database directory locked: another process has exclusive access")]
    Locked,

    /// The database directory path is invalid.
    #[error("invalid database directory: {message}")]
    InvalidDirectory {
        /// Description of the problem.
        message: String,
    },

    /// A table name contains characters that cannot form a file name.
    #[error("invalid table name: {name:?} (path {path:?} escapes the database directory)")]
    InvalidTableName {
        /// The offending name.
        name: String,
        /// The path it would have resolved to.
        path: PathBuf,
    },
}

impl StoreError {
    /// Creates an unreadable-table error.
    pub fn unreadable(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreadable {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid-directory error.
    pub fn invalid_directory(message: impl Into<String>) -> Self {
        Self::InvalidDirectory {
            message: message.into(),
        }
    }
}
