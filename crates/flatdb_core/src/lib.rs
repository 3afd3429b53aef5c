//! # flatdb Core
//!
//! Query layer and backend adapter for flatdb.
//!
//! This crate provides:
//! - A fluent filter/sort/cap query builder over schema-less tables
//! - A type-aware predicate evaluator shared by filtering and ordering
//! - A mutation gateway with identifier allocation and filter-required
//!   update/delete rules
//! - Dependency guarding for destructive deletes
//! - A backend adapter presenting the same query surface over the
//!   embedded file store or an external SQLite database, with value
//!   coercion at the relational boundary
//!
//! ## Example
//!
//! ```rust,ignore
//! use flatdb_core::{Config, Database, Direction, Op, Record};
//!
//! let db = Database::open(Config::new("data"))?;
//! db.table("players").insert(Record::new().with("name", "A").with("score", 10))?;
//!
//! let best = db
//!     .table("players")
//!     .order("score", Direction::Asc)
//!     .last_of_ordered()?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod config;
mod database;
mod error;
mod guard;
mod predicate;
mod query;

pub use backend::{Backend, EmbeddedBackend, SqliteBackend};
pub use config::{Config, RelationalConfig};
pub use database::Database;
pub use error::{CoreError, CoreResult};
pub use guard::{CleanupRule, GuardRule, GuardViolation};
pub use predicate::{compare_values, Op, Predicate};
pub use query::{Direction, Query, QuerySpec};

pub use flatdb_value::{Record, Value, ID_FIELD};
