//! Document store collaborator.
//!
//! The cascade engine does not own persistence. It talks to a
//! [`DocumentStore`] for the four operations it needs:
//!
//! - `fetch` one record by id (to materialize relations)
//! - `find` every record of a collection referencing an id (to locate
//!   dependents), returned as a single-use [`RecordStream`]
//! - `persist` one record (each persist is its own unit of atomicity)
//! - `remove` one record
//!
//! Every call is a suspension point. Implementations must be `Send + Sync`
//! so an engine can be shared across tasks.
//!
//! [`memory::MemoryStore`] is an in-process implementation used by the test
//! suites and usable as a reference backend.

pub mod memory;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::core::{Record, RecordId};
use crate::paths::access::get_path;

/// All errors a [`DocumentStore`] implementation can return.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// No record with the given identity exists.
    #[error("record not found: {collection}:{id}")]
    NotFound {
        /// Collection name
        collection: String,
        /// Record id
        id: String,
    },

    /// The store refused the operation (validation, constraint, injected failure).
    #[error("store rejected {operation} of {collection}:{id}: {reason}")]
    Rejected {
        /// `persist`, `remove`, ...
        operation: String,
        /// Collection name
        collection: String,
        /// Record id
        id: String,
        /// Reason given by the store
        reason: String,
    },

    /// A backend-specific failure (connection, serialization, ...).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Lazily produced query results. Finite and consumed once; issue a fresh
/// [`DocumentStore::find`] to iterate again.
pub type RecordStream = BoxStream<'static, Result<Record, StoreError>>;

/// Query selecting records whose relation path references one id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Relation path on the queried collection.
    pub path: String,
    /// Referenced record id.
    pub id: RecordId,
}

impl Filter {
    /// Records whose `path` references `id`.
    pub fn references(path: impl Into<String>, id: RecordId) -> Self {
        Self {
            path: path.into(),
            id,
        }
    }

    /// True when `record` matches: the value at `path` is the id, an array
    /// containing it, or an object having it as an entry value.
    pub fn matches(&self, record: &Record) -> bool {
        match get_path(record.body(), &self.path) {
            Some(Value::Array(items)) => items.iter().any(|item| self.is_id(item)),
            Some(Value::Object(entries)) => entries.values().any(|item| self.is_id(item)),
            Some(value) => self.is_id(value),
            None => false,
        }
    }

    fn is_id(&self, value: &Value) -> bool {
        RecordId::from_reference(value).is_some_and(|id| id == self.id)
    }
}

/// Persistence operations required by the cascade engine.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load one record. `Ok(None)` when it does not exist.
    async fn fetch(&self, collection: &str, id: &RecordId) -> Result<Option<Record>, StoreError>;

    /// Stream every record of `collection` matching `filter`.
    async fn find(&self, collection: &str, filter: &Filter) -> Result<RecordStream, StoreError>;

    /// Write one record, inserting or replacing it.
    async fn persist(&self, record: &Record) -> Result<(), StoreError>;

    /// Delete one record. Removing a missing record is not an error.
    async fn remove(&self, collection: &str, id: &RecordId) -> Result<(), StoreError>;
}
