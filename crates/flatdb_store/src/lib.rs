//! # flatdb Store
//!
//! Embedded file-backed table store for flatdb.
//!
//! Each collection persists as one JSON document `<dir>/<table>.json`
//! holding the full ordered array of records. The store owns the
//! load / full-rewrite / identifier-bookkeeping cycle:
//!
//! - a missing table file is an empty collection, not an error
//! - `persist` replaces the whole document via write-temp-then-rename,
//!   so concurrent readers never see a partial file
//! - `next_id` is recomputed from the live document on every insert
//!   (no persisted counter), which is only safe because every mutation
//!   runs inside [`TableStore::mutate`]'s per-table critical section
//!
//! Cross-process exclusivity comes from an advisory lock on a `LOCK`
//! file in the database directory, taken when the directory is opened.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod dir;
mod error;
mod table;

pub use dir::DatabaseDir;
pub use error::{StoreError, StoreResult};
pub use table::{TableLockGuard, TableStore};
