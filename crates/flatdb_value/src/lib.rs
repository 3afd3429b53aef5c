//! # flatdb Value
//!
//! Dynamic value model and record type for flatdb.
//!
//! Records in flatdb are schema-less: each one is a mapping from field
//! name to a dynamically-typed [`Value`]. Collections persist as plain
//! JSON documents (an array of mappings), so the value universe is
//! exactly the JSON one plus a distinct integer/float split.
//!
//! ## Example
//!
//! ```rust
//! use flatdb_value::{Record, Value};
//!
//! let record = Record::new()
//!     .with("name", "Alice")
//!     .with("score", 42)
//!     .with("active", true);
//!
//! assert_eq!(record.get("score"), Some(&Value::Integer(42)));
//! assert!(record.id().is_none()); // ids are assigned by the store
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod record;
mod value;

pub use record::{Record, ID_FIELD};
pub use value::Value;
