//! Database directory management.
//!
//! This module handles the file system layout for the embedded backend:
//!
//! ```text
//! <db_path>/
//! ├─ LOCK              # Advisory lock for single-process access
//! ├─ users.json        # One JSON document per collection
//! └─ posts.json
//! ```
//!
//! The LOCK file ensures only one process opens the database at a time.
//! Table documents are created lazily on first insert.

use crate::error::{StoreError, StoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// File name of the advisory lock within the database directory.
const LOCK_FILE: &str = "LOCK";

/// Extension used for table documents.
pub(crate) const TABLE_EXT: &str = "json";

/// Suffix for the temporary file written before the atomic rename.
pub(crate) const TEMP_SUFFIX: &str = "tmp";

/// Manages the database directory and its process-exclusive lock.
///
/// # Thread Safety
///
/// The `DatabaseDir` holds an exclusive advisory lock on the directory's
/// LOCK file for its whole lifetime. Only one instance can exist per
/// directory across processes; the lock is released on drop.
#[derive(Debug)]
pub struct DatabaseDir {
    /// Root directory path.
    path: PathBuf,
    /// Lock file handle (held for exclusive access).
    _lock_file: File,
}

impl DatabaseDir {
    /// Opens or creates a database directory.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the database directory
    /// * `create_if_missing` - If true, creates the directory if it doesn't exist
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - The path exists but is not a directory
    /// - Another process holds the lock (returns [`StoreError::Locked`])
    /// - I/O errors occur
    pub fn open(path: &Path, create_if_missing: bool) -> StoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(StoreError::invalid_directory(format!(
                    "database directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(StoreError::invalid_directory(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_path = path.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        // Non-blocking: a held lock is an immediate error, not a wait.
        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the path to the database directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of a table's document, validating the name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidTableName`] if the name would resolve
    /// outside the database directory (path separators, `..`, empty name).
    pub fn table_path(&self, table: &str) -> StoreResult<PathBuf> {
        let candidate = self.path.join(format!("{table}.{TABLE_EXT}"));
        let valid = !table.is_empty()
            && !table.contains(['/', '\\'])
            && table != "."
            && table != "..";
        if !valid {
            return Err(StoreError::InvalidTableName {
                name: table.to_string(),
                path: candidate,
            });
        }
        Ok(candidate)
    }

    /// Returns the temp-file path used while atomically rewriting a table.
    pub(crate) fn table_temp_path(&self, table: &str) -> StoreResult<PathBuf> {
        let path = self.table_path(table)?;
        Ok(path.with_extension(format!("{TABLE_EXT}.{TEMP_SUFFIX}")))
    }
}
