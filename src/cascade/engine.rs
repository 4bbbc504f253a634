//! The cascade engine.
//!
//! Every [`CascadeEngine::save`] runs one propagation session:
//!
//! 1. **Recompute own fields.** Denormalized fields of the saved record are
//!    recomputed when their relation was modified, or when the session
//!    enforces their relation because an upstream record changed. Up to
//!    `field_concurrency` fields are recomputed at once; results are applied
//!    only when every field succeeded.
//! 2. **Persist** the record and clear its modification state.
//! 3. **Evaluate outgoing edges** of the record's collection. Without
//!    dependents the session ends here.
//! 4. **Cascade to targets** when the save changed something or the record is
//!    itself being cascaded. Edges are processed one at a time. For each edge
//!    the join bindings are queried (up to `binding_concurrency` queries open
//!    at once) and every matching dependent is re-saved, one at a time, inside
//!    the same session. A `(source, dependent)` pair already visited in the
//!    session is skipped, so cyclic declarations terminate.
//!
//! The record is persisted before its dependents are cascaded, so dependents
//! read its new state. Failures unwind the whole session and reach the
//! caller with the record, field or edge that failed; records persisted
//! before the failure stay persisted.

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt, TryFutureExt, TryStreamExt, stream};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{Instrument, debug, debug_span, info, info_span, trace};

use super::recompute::{Recomputed, recompute};
use super::session::{CascadeReport, PropagationSession, Trigger};
use crate::config::CascadeConfig;
use crate::core::{InstanceKey, Record};
use crate::registry::{Registry, ResolvedField};
use crate::store::{DocumentStore, Filter, RecordStream};

/// Keeps denormalized fields consistent across a [`DocumentStore`].
///
/// The engine is cheap to clone and can be shared between tasks; every call
/// runs its own [`PropagationSession`].
#[derive(Debug)]
pub struct CascadeEngine<S: DocumentStore> {
    registry: Arc<Registry>,
    store: Arc<S>,
    config: CascadeConfig,
}

impl<S: DocumentStore> Clone for CascadeEngine<S> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: DocumentStore> CascadeEngine<S> {
    /// Engine with the default configuration.
    pub fn new(registry: Arc<Registry>, store: Arc<S>) -> Self {
        Self {
            registry,
            store,
            config: CascadeConfig::default(),
        }
    }

    /// Engine with an explicit configuration.
    ///
    /// Fails when the configuration does not pass [`CascadeConfig::validate`].
    pub fn with_config(registry: Arc<Registry>, store: Arc<S>, config: CascadeConfig) -> Result<Self> {
        config.validate().context("Invalid cascade engine configuration")?;
        Ok(Self {
            registry,
            store,
            config,
        })
    }

    /// Declared collections and their dependency graph.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Active configuration.
    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    /// Save `record` and propagate the change to every dependent record.
    ///
    /// On success the record holds its recomputed fields and has no pending
    /// modifications. When a cyclic declaration made the cascade re-save the
    /// record, it is reloaded from the store so it carries the values written
    /// by that re-save.
    pub async fn save(&self, record: &mut Record) -> Result<CascadeReport> {
        let mut session = PropagationSession::new(Trigger::Save);
        let span = info_span!(
            "cascade",
            session = %session.id(),
            collection = %record.collection(),
            id = %record.id()
        );

        self.save_in_session(record, &mut session).instrument(span.clone()).await?;

        let key = record.instance_key();
        if session.report().persist_count(key.as_str()) > 1 {
            self.refresh(record).instrument(span.clone()).await?;
        }

        let report = session.into_report();
        span.in_scope(|| finished(&report));
        Ok(report)
    }

    /// Replace `record` with its stored state.
    async fn refresh(&self, record: &mut Record) -> Result<()> {
        let key = record.instance_key();
        let stored = self
            .store
            .fetch(record.collection(), record.id())
            .await
            .with_context(|| format!("Failed to reload {key}"))?;
        if let Some(stored) = stored {
            debug!("Reloaded {} after it was re-saved by its own cascade", key);
            *record = stored;
        }
        Ok(())
    }

    /// Remove `record` and, when `use_on_remove` is set, re-evaluate every
    /// record that denormalizes from it.
    ///
    /// Within the session the removed record resolves as absent: single
    /// relations to it become `null` and sequence or keyed entries pointing at
    /// it are dropped.
    pub async fn remove(&self, record: &Record) -> Result<CascadeReport> {
        let mut session = PropagationSession::new(Trigger::Remove);
        let span = info_span!(
            "cascade",
            session = %session.id(),
            collection = %record.collection(),
            id = %record.id()
        );

        self.remove_in_session(record, &mut session).instrument(span.clone()).await?;

        let report = session.into_report();
        span.in_scope(|| finished(&report));
        Ok(report)
    }

    async fn remove_in_session(&self, record: &Record, session: &mut PropagationSession) -> Result<()> {
        let key = record.instance_key();
        self.store
            .remove(record.collection(), record.id())
            .await
            .with_context(|| format!("Failed to remove {key}"))?;

        if !self.config.use_on_remove {
            debug!("Cascade on remove disabled; dependents of {} left as is", key);
            return Ok(());
        }

        session.mark_removed(key);
        self.cascade(record, session).await
    }

    /// Recompute, persist and cascade one record inside `session`.
    ///
    /// Boxed because cascading re-enters it for every dependent.
    fn save_in_session<'a>(
        &'a self,
        record: &'a mut Record,
        session: &'a mut PropagationSession,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let key = record.instance_key();
            self.recompute_own_fields(record, session).await?;

            let changed = record.any_modified();
            let enforced = session.is_enforced(&key);

            self.store
                .persist(record)
                .await
                .with_context(|| format!("Failed to persist {key}"))?;
            session.record_persist(key.clone());
            record.clear_modified();

            if !changed && !enforced {
                trace!("{} unchanged; not cascading", key);
                return Ok(());
            }
            self.cascade(record, session).await
        }
        .boxed()
    }

    /// Recompute every denormalized field of `record` that is due.
    async fn recompute_own_fields(&self, record: &mut Record, session: &mut PropagationSession) -> Result<()> {
        let Some(collection) = self.registry.collection(record.collection()) else {
            return Ok(());
        };

        let key = record.instance_key();
        let due: Vec<&ResolvedField> = collection
            .denormalized()
            .iter()
            .filter(|field| session.is_enforced_for(&key, field.from()) || record.is_modified(field.from()))
            .collect();
        if due.is_empty() {
            return Ok(());
        }

        let snapshot: &Record = record;
        let observed: &PropagationSession = session;
        let fields = &due;
        let mut results: Vec<(usize, Recomputed)> = stream::iter(0..due.len())
            .map(|index| {
                self.recompute_one(snapshot, fields[index], observed)
                    .map_ok(move |result| (index, result))
            })
            .buffer_unordered(self.config.field_concurrency)
            .try_collect()
            .await?;
        results.sort_by_key(|(index, _)| *index);

        for (index, result) in results {
            let field = due[index];
            if let Some(relation) = result.relation {
                record.set(field.from(), relation);
            }
            record.set(field.to(), result.destination);
            session.record_recompute(key.clone(), field.key());
            debug!("Recomputed {} field '{}'", key, field.key());
        }
        Ok(())
    }

    /// Recompute one field of `snapshot` without modifying it.
    fn recompute_one<'a>(
        &'a self,
        snapshot: &'a Record,
        field: &'a ResolvedField,
        session: &'a PropagationSession,
    ) -> BoxFuture<'a, Result<Recomputed>> {
        async move {
            recompute(self.store.as_ref(), snapshot, field, session)
                .await
                .with_context(|| format!("Failed to recompute field '{}' of {}", field.key(), snapshot.instance_key()))
        }
        .boxed()
    }

    /// Query `dependent` records matching `filter`.
    fn open_cursor<'a>(
        &'a self,
        dependent: &'a str,
        filter: Filter,
        source: &'a InstanceKey,
    ) -> BoxFuture<'a, Result<RecordStream>> {
        async move {
            self.store.find(dependent, &filter).await.with_context(|| {
                format!(
                    "Failed to find {} records whose '{}' references {}",
                    dependent, filter.path, source
                )
            })
        }
        .boxed()
    }

    /// Re-save every record that denormalizes from `record`.
    async fn cascade(&self, record: &Record, session: &mut PropagationSession) -> Result<()> {
        let source_key = record.instance_key();
        let source = &source_key;
        let dependents = self.registry.graph().dependents(record.collection());
        if dependents.is_empty() {
            trace!("{} has no dependents", record.collection());
            return Ok(());
        }

        for dependent in dependents {
            let bindings = self.registry.graph().bindings(record.collection(), dependent);

            let filters: Vec<Filter> = bindings
                .iter()
                .map(|binding| Filter::references(binding.from.as_str(), record.id().clone()))
                .collect();
            let cursors: Vec<RecordStream> = stream::iter(filters)
                .map(|filter| self.open_cursor(dependent, filter, source))
                .buffered(self.config.binding_concurrency)
                .try_collect()
                .await?;

            for mut cursor in cursors {
                while let Some(next) = cursor.next().await {
                    let mut target = next.with_context(|| format!("Failed to read {dependent} records"))?;
                    let target_key = target.instance_key();
                    if !session.visit(source, &target_key) {
                        trace!("{} -> {} already cascaded", source, target_key);
                        continue;
                    }

                    let relations: BTreeSet<String> = bindings
                        .iter()
                        .filter(|binding| {
                            Filter::references(binding.from.as_str(), record.id().clone()).matches(&target)
                        })
                        .map(|binding| binding.from.clone())
                        .collect();
                    session.enforce(target_key.clone(), relations);
                    session.enter();

                    let span = debug_span!(
                        "cascade_target",
                        source = %source,
                        target = %target_key,
                        depth = session.depth()
                    );
                    let result = self.save_in_session(&mut target, session).instrument(span).await;

                    session.leave();
                    session.release(&target_key);
                    result.with_context(|| {
                        format!(
                            "Failed to cascade {} -> {} (edge {} -> {})",
                            source,
                            target_key,
                            record.collection(),
                            dependent
                        )
                    })?;
                }
            }
        }
        Ok(())
    }

    /// Keys of the records that would be cascaded if `record` changed.
    ///
    /// Queries the store but does not modify anything.
    pub async fn dependents_of(&self, record: &Record) -> Result<Vec<InstanceKey>> {
        let mut found = Vec::new();
        for dependent in self.registry.graph().dependents(record.collection()) {
            for binding in self.registry.graph().bindings(record.collection(), dependent) {
                let filter = Filter::references(binding.from.as_str(), record.id().clone());
                let mut cursor = self
                    .store
                    .find(dependent, &filter)
                    .await
                    .with_context(|| format!("Failed to find {dependent} records referencing {}", record.instance_key()))?;
                while let Some(next) = cursor.next().await {
                    let key = next?.instance_key();
                    if !found.contains(&key) {
                        found.push(key);
                    }
                }
            }
        }
        Ok(found)
    }
}

fn finished(report: &CascadeReport) {
    info!(
        "Cascade finished: {} recompute(s), {} edge(s), {} persist(s), depth {}",
        report.recomputed.len(),
        report.edges.len(),
        report.persisted.len(),
        report.max_depth
    );
}
