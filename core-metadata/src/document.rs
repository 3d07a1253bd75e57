//! # Index Documents
//!
//! The flat field map posted to the search engine, plus the partial-update
//! and delete commands that travel alongside it.
//!
//! Fields are added first-writer-wins: once a key holds a value, later adds
//! for the same key are ignored. Overwriting is explicit through
//! [`IndexDocument::set`]. Text is trimmed and empty values never land.

use core_storage::ObjectId;
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// One field value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
    List(Vec<String>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Every text carried by the value, scalar or list
    pub fn texts(&self) -> Vec<&str> {
        match self {
            FieldValue::Text(text) => vec![text.as_str()],
            FieldValue::List(items) => items.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Trimmed copy, or `None` if nothing is left
    fn normalized(self) -> Option<Self> {
        match self {
            FieldValue::Text(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| FieldValue::Text(text.to_string()))
            }
            FieldValue::List(items) => {
                let items: Vec<String> = items
                    .into_iter()
                    .map(|item| item.trim().to_string())
                    .filter(|item| !item.is_empty())
                    .collect();
                (!items.is_empty()).then_some(FieldValue::List(items))
            }
            other => Some(other),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

/// Output of an extractor or indexing step
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Flat document keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct IndexDocument {
    fields: BTreeMap<String, FieldValue>,
}

impl IndexDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field unless the key is already set. Returns true if written.
    pub fn add(&mut self, key: &str, value: impl Into<FieldValue>) -> bool {
        let key = key.trim();
        if key.is_empty() || self.fields.contains_key(key) {
            return false;
        }
        match value.into().normalized() {
            Some(value) => {
                self.fields.insert(key.to_string(), value);
                true
            }
            None => false,
        }
    }

    /// Write a field, replacing any existing value
    pub fn set(&mut self, key: &str, value: impl Into<FieldValue>) {
        if let Some(value) = value.into().normalized() {
            self.fields.insert(key.trim().to_string(), value);
        }
    }

    /// Add every field of a map, first writer wins
    pub fn add_all(&mut self, fields: FieldMap) {
        for (key, value) in fields {
            self.add(&key, value);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_text)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Atomic `set` updates for one document, independent of its other fields
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicPatch {
    pub pid: ObjectId,
    pub sets: BTreeMap<String, Value>,
}

impl AtomicPatch {
    pub fn new(pid: ObjectId) -> Self {
        Self {
            pid,
            sets: BTreeMap::new(),
        }
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.sets.insert(field.to_string(), value.into());
        self
    }
}

impl Serialize for AtomicPatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut doc = Map::new();
        doc.insert("pid".to_string(), Value::String(self.pid.to_string()));
        for (field, value) in &self.sets {
            doc.insert(field.clone(), json!({ "set": value }));
        }
        Value::Object(doc).serialize(serializer)
    }
}

/// Stored fields of a document as the search engine currently holds it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSnapshot {
    fields: Map<String, Value>,
}

impl DocumentSnapshot {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Write sent to the search engine
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateCommand {
    Add(IndexDocument),
    Patch(AtomicPatch),
    Delete(ObjectId),
}

impl UpdateCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            UpdateCommand::Add(_) => "add",
            UpdateCommand::Patch(_) => "patch",
            UpdateCommand::Delete(_) => "delete",
        }
    }

    /// JSON body for the update endpoint
    pub fn to_body(&self) -> Value {
        match self {
            UpdateCommand::Add(doc) => json!({ "add": { "doc": doc } }),
            UpdateCommand::Patch(patch) => json!({ "add": { "doc": patch } }),
            UpdateCommand::Delete(pid) => json!({ "delete": { "id": pid.as_str() } }),
        }
    }
}
