//! Schema-less record type.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The reserved identifier field present on every stored record.
pub const ID_FIELD: &str = "id";

/// One schema-less record: a mapping from field name to [`Value`].
///
/// Every record persisted in a collection carries a unique integer `id`
/// assigned by the store. Callers never supply `id` on insert and cannot
/// change it through update; the mutation layer enforces both rules.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, consuming and returning the record for chaining.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Sets a field in place.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Returns the value of a field, if present.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Removes a field, returning its prior value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Returns true if the record carries the named field.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Returns the record's assigned identifier, if it has one.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.fields.get(ID_FIELD).and_then(Value::as_integer)
    }

    /// Assigns the identifier field. Reserved for the store.
    pub fn assign_id(&mut self, id: i64) {
        self.fields.insert(ID_FIELD.to_string(), Value::Integer(id));
    }

    /// Merges another record's fields into this one, field by field.
    ///
    /// Existing fields are overwritten, missing ones are added; fields
    /// not named in `patch` are left untouched. The `id` field is never
    /// merged, whatever the patch says.
    pub fn merge(&mut self, patch: &Record) {
        for (field, value) in &patch.fields {
            if field == ID_FIELD {
                continue;
            }
            self.fields.insert(field.clone(), value.clone());
        }
    }

    /// Number of fields on the record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over `(field, value)` pairs in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Names of all fields on the record, in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl From<BTreeMap<String, Value>> for Record {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
