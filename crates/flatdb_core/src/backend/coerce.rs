//! Value coercion at the relational boundary.
//!
//! Coercion is write-side only. Structured values are serialized to
//! JSON text and booleans become 0/1 integers on the way into SQL, but
//! nothing is deserialized on the way back out: a stored map reads back
//! as its JSON text and a stored boolean reads back as an integer. The
//! asymmetry is inherited from the source design and is preserved here
//! deliberately, pinned by tests, rather than silently corrected.

use flatdb_value::Value;
use rusqlite::types::{Value as SqlValue, ValueRef};

/// Coerces one record value into its SQL representation.
///
/// - `Null` passes through
/// - `Bool` becomes integer 0/1
/// - `Integer`/`Float`/`Text` pass through unchanged
/// - `Array`/`Map` become their JSON text
pub(crate) fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Integer(n) => SqlValue::Integer(*n),
        Value::Float(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
        // Serializing a Value never fails: every variant is valid JSON.
        Value::Array(_) | Value::Map(_) => {
            SqlValue::Text(serde_json::to_string(value).unwrap_or_default())
        }
    }
}

/// Reads one SQL column value back as a record value, without undoing
/// write-side coercion.
///
/// Returns `None` for SQL NULL: a schema-less record simply lacks the
/// field rather than carrying an explicit null for every column another
/// record once used.
pub(crate) fn from_sql(value: ValueRef<'_>) -> Option<Value> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(n) => Some(Value::Integer(n)),
        ValueRef::Real(f) => Some(Value::Float(f)),
        ValueRef::Text(bytes) => Some(Value::Text(String::from_utf8_lossy(bytes).into_owned())),
        ValueRef::Blob(bytes) => Some(Value::Text(String::from_utf8_lossy(bytes).into_owned())),
    }
}
