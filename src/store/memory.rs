//! In-process [`DocumentStore`] backed by `DashMap`.
//!
//! Records are kept per collection in id order, so `find` streams results
//! deterministically. The store counts persists per record and can be told to
//! fail specific operations, which is what the cascade tests use to observe
//! propagation and partial failure.

use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use futures::stream;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{DocumentStore, Filter, RecordStream, StoreError};
use crate::core::{InstanceKey, Record, RecordId};

/// In-memory document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Bodies by collection, then id.
    collections: Arc<DashMap<String, BTreeMap<RecordId, Value>>>,
    /// Successful persists per record.
    persists: DashMap<InstanceKey, usize>,
    /// Total successful persists.
    total_persists: AtomicUsize,
    /// Injected persist failures by record.
    failing_persists: DashMap<InstanceKey, String>,
    /// Injected query failures by collection.
    failing_finds: DashMap<String, String>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `record` directly, without counting it as a persist.
    pub fn insert(&self, record: &Record) {
        self.collections
            .entry(record.collection().to_string())
            .or_default()
            .insert(record.id().clone(), record.body().clone());
    }

    /// Current stored state of a record.
    pub fn get(&self, collection: &str, id: impl Into<RecordId>) -> Option<Record> {
        let id = id.into();
        let records = self.collections.get(collection)?;
        let body = records.get(&id)?.clone();
        Some(Record::from_body(collection, id, body))
    }

    /// Number of records stored in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, |records| records.len())
    }

    /// True when no collection holds any record.
    pub fn is_empty(&self) -> bool {
        self.collections.iter().all(|entry| entry.value().is_empty())
    }

    /// Successful persists of one record since the store was created.
    pub fn persist_count(&self, collection: &str, id: impl Into<RecordId>) -> usize {
        let key = InstanceKey::new(collection, &id.into());
        self.persists.get(&key).map_or(0, |count| *count)
    }

    /// Successful persists across all records.
    pub fn total_persists(&self) -> usize {
        self.total_persists.load(Ordering::SeqCst)
    }

    /// Make every persist of one record fail with `reason`.
    pub fn fail_persist(&self, collection: &str, id: impl Into<RecordId>, reason: impl Into<String>) {
        let key = InstanceKey::new(collection, &id.into());
        self.failing_persists.insert(key, reason.into());
    }

    /// Make every query against `collection` fail with `reason`.
    pub fn fail_find(&self, collection: &str, reason: impl Into<String>) {
        self.failing_finds.insert(collection.to_string(), reason.into());
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        self.failing_persists.clear();
        self.failing_finds.clear();
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch(&self, collection: &str, id: &RecordId) -> Result<Option<Record>, StoreError> {
        Ok(self.get(collection, id.clone()))
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<RecordStream, StoreError> {
        if let Some(reason) = self.failing_finds.get(collection) {
            return Err(StoreError::Backend(format!(
                "query on '{collection}' failed: {}",
                reason.value()
            )));
        }

        // Matching ids are fixed when the query opens; bodies are read when the
        // stream is polled, so earlier writes in the same cascade are visible.
        let ids: Vec<RecordId> = match self.collections.get(collection) {
            Some(records) => records
                .iter()
                .filter(|(id, body)| {
                    filter.matches(&Record::from_body(collection, (*id).clone(), (*body).clone()))
                })
                .map(|(id, _)| id.clone())
                .collect(),
            None => Vec::new(),
        };

        tracing::trace!(
            "find {} where {} = {}: {} match(es)",
            collection,
            filter.path,
            filter.id,
            ids.len()
        );

        let collections = Arc::clone(&self.collections);
        let collection = collection.to_string();
        let filter = filter.clone();
        Ok(stream::iter(ids)
            .filter_map(move |id| {
                let record = collections
                    .get(&collection)
                    .and_then(|records| records.get(&id).cloned())
                    .map(|body| Record::from_body(collection.as_str(), id, body))
                    .filter(|record| filter.matches(record));
                async move { record.map(Ok) }
            })
            .boxed())
    }

    async fn persist(&self, record: &Record) -> Result<(), StoreError> {
        let key = record.instance_key();
        if let Some(reason) = self.failing_persists.get(&key) {
            return Err(StoreError::Rejected {
                operation: "persist".to_string(),
                collection: record.collection().to_string(),
                id: record.id().to_string(),
                reason: reason.value().clone(),
            });
        }

        self.insert(record);
        *self.persists.entry(key).or_insert(0) += 1;
        self.total_persists.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, collection: &str, id: &RecordId) -> Result<(), StoreError> {
        if let Some(mut records) = self.collections.get_mut(collection) {
            records.remove(id);
        }
        Ok(())
    }
}
