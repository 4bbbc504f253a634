//! In-memory form of a stored record.
//!
//! A [`Record`] is a JSON object body plus the bookkeeping the cascade engine
//! needs: which paths were modified since the record was loaded, and which
//! relations the caller has already materialized ("populated"). Populated
//! relations live beside the body, never inside it, so persisting a record
//! never embeds the related data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::paths::access::{get_path, set_path};

/// Identifier of a record within its collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The JSON form stored in relation fields.
    pub fn to_value(&self) -> Value {
        Value::String(self.0.clone())
    }

    /// Read a reference stored in a relation field.
    ///
    /// Accepts non-empty strings and numbers; integral numbers render without
    /// a fractional part, so `7` and `7.0` both reference `"7"`.
    pub fn from_reference(value: &Value) -> Option<Self> {
        match value {
            Value::String(id) if !id.is_empty() => Some(Self(id.clone())),
            Value::Number(n) => Some(Self(match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
                _ => n.to_string(),
            })),
            _ => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// `collection:id`, the identity of one record across the whole store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceKey(String);

impl InstanceKey {
    /// Build the key for a record of `collection` with `id`.
    pub fn new(collection: &str, id: &RecordId) -> Self {
        Self(format!("{collection}:{id}"))
    }

    /// Borrow the key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Materialized target(s) of a relation field, by cardinality.
///
/// `None` / missing entries stand for references that resolve to nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum RelatedValue {
    /// Body of the single referenced record.
    Single(Option<Value>),
    /// Bodies of the referenced records, in reference order.
    Sequence(Vec<Value>),
    /// Bodies of the referenced records keyed like the relation field.
    Keyed(Vec<(String, Value)>),
}

/// A record of one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    collection: String,
    id: RecordId,
    body: Value,
    modified: BTreeSet<String>,
    populated: HashMap<String, RelatedValue>,
}

impl Record {
    /// A new, empty record. Nothing is marked modified until fields are set.
    pub fn new(collection: impl Into<String>, id: impl Into<RecordId>) -> Self {
        Self::from_body(collection, id, Value::Object(Map::new()))
    }

    /// A record as loaded from the store, with no pending modifications.
    ///
    /// A non-object body is replaced with an empty object.
    pub fn from_body(collection: impl Into<String>, id: impl Into<RecordId>, body: Value) -> Self {
        let body = if body.is_object() { body } else { Value::Object(Map::new()) };
        Self {
            collection: collection.into(),
            id: id.into(),
            body,
            modified: BTreeSet::new(),
            populated: HashMap::new(),
        }
    }

    /// Builder form of [`Record::set`].
    #[must_use]
    pub fn with(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.set(path, value);
        self
    }

    /// Collection (record type) name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Record identifier.
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// `collection:id`.
    pub fn instance_key(&self) -> InstanceKey {
        InstanceKey::new(&self.collection, &self.id)
    }

    /// Whole body.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Take the body, dropping the bookkeeping.
    pub fn into_body(self) -> Value {
        self.body
    }

    /// Read a dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        get_path(&self.body, path)
    }

    /// Write a dotted path, marking it modified when the value changes.
    ///
    /// A change also detaches populated relations at `path`, its ancestors
    /// and its descendants, since they no longer describe the stored
    /// references. Returns whether the value changed.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> bool {
        let changed = set_path(&mut self.body, path, value.into());
        if changed {
            self.populated.retain(|populated, _| !is_related_path(path, populated));
            self.modified.insert(path.to_string());
        }
        changed
    }

    /// True when `path`, one of its ancestors, or one of its descendants was
    /// modified.
    pub fn is_modified(&self, path: &str) -> bool {
        self.modified.iter().any(|m| is_related_path(m, path))
    }

    /// True when any path was modified.
    pub fn any_modified(&self) -> bool {
        !self.modified.is_empty()
    }

    /// Modified paths, sorted.
    pub fn modified_paths(&self) -> impl Iterator<Item = &str> {
        self.modified.iter().map(String::as_str)
    }

    /// Forget pending modifications, typically after a successful persist.
    pub fn clear_modified(&mut self) {
        self.modified.clear();
    }

    /// Attach already-materialized relation targets for `path`.
    pub fn populate(&mut self, path: impl Into<String>, related: RelatedValue) {
        self.populated.insert(path.into(), related);
    }

    /// Return `path` to its reference-only form.
    pub fn depopulate(&mut self, path: &str) -> Option<RelatedValue> {
        self.populated.remove(path)
    }

    /// True when `path` has materialized targets attached.
    pub fn is_populated(&self, path: &str) -> bool {
        self.populated.contains_key(path)
    }

    /// Materialized targets of `path`, if populated.
    pub fn populated(&self, path: &str) -> Option<&RelatedValue> {
        self.populated.get(path)
    }
}

fn is_related_path(modified: &str, path: &str) -> bool {
    fn is_prefix(prefix: &str, path: &str) -> bool {
        path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('.'))
    }
    modified == path || is_prefix(modified, path) || is_prefix(path, modified)
}
