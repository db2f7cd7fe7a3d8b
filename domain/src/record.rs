use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::DomainError;

// --- Record ID ---
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}
impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
impl From<RecordId> for String {
    fn from(record_id: RecordId) -> Self {
        record_id.0
    }
}
impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// --- Record ---

/// A single flat field-mapping stored in a collection.
///
/// Field order is kept as inserted, and serialization is transparent: a record is
/// stored as a plain JSON object.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// The `id` field, when it is a string. Numeric ids never match a string id.
    pub fn id(&self) -> Option<&str> {
        self.fields.get("id").and_then(Value::as_str)
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.id() == Some(id)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.shift_remove(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Shallow merge: every field of `partial` overwrites the same-named field here,
    /// fields not mentioned in `partial` are left alone. Existing fields keep their
    /// position, new ones are appended.
    pub fn merge(&mut self, partial: Record) {
        for (name, value) in partial.fields {
            self.fields.insert(name, value);
        }
    }

    /// Stringified field value as used by search. Missing and `null` fields are empty.
    pub fn field_text(&self, field: &str) -> String {
        self.fields.get(field).map(value_text).unwrap_or_default()
    }

    /// Case-insensitive substring match of `term` against any of `fields`.
    pub fn matches<S: AsRef<str>>(&self, term: &str, fields: &[S]) -> bool {
        let needle = term.to_lowercase();
        fields.iter().any(|field| {
            self.field_text(field.as_ref())
                .to_lowercase()
                .contains(&needle)
        })
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self::from_fields(fields)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(record.fields)
    }
}

impl TryFrom<Value> for Record {
    type Error = DomainError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(DomainError::InvalidFieldValue {
                field: "record".to_string(),
                reason: format!("Expected an object, got {}", other),
            }),
        }
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}
