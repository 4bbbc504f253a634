//! Per-write propagation state.
//!
//! A [`PropagationSession`] is created by every top-level save or remove and
//! threaded by `&mut` through the whole recursive cascade. It is never
//! attached to a record and never shared between two top-level writes.
//!
//! It holds:
//!
//! - the **visited-edge set**: `(source instance, dependent instance)` pairs
//!   already cascaded; a pair is processed at most once per session, which is
//!   what makes cascades over cyclic declarations terminate
//! - the **enforced** relation paths of records being re-saved because an
//!   upstream record changed; their fields over those relations are
//!   recomputed even though the caller did not modify them
//! - the instances **removed** by the write, which resolve as absent
//! - a [`CascadeReport`] of everything that happened

use std::collections::{BTreeSet, HashMap, HashSet};
use uuid::Uuid;

use crate::core::InstanceKey;

/// What started a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A record was saved.
    Save,
    /// A record was removed.
    Remove,
}

/// Summary of one propagation session, returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeReport {
    /// Session identifier, also present on the session's tracing span.
    pub session: Uuid,
    /// What started the session.
    pub trigger: Trigger,
    /// `(instance, field key)` for every recompute, in order.
    pub recomputed: Vec<(InstanceKey, String)>,
    /// `(source, dependent)` instance pairs cascaded, in order.
    pub edges: Vec<(InstanceKey, InstanceKey)>,
    /// Instances persisted, in order (a record may appear more than once).
    pub persisted: Vec<InstanceKey>,
    /// Deepest nesting of cascaded saves.
    pub max_depth: usize,
}

impl CascadeReport {
    /// Number of recomputes of `field` on the record `instance` (`collection:id`).
    pub fn recompute_count(&self, instance: &str, field: &str) -> usize {
        self.recomputed.iter().filter(|(key, f)| key.as_str() == instance && f == field).count()
    }

    /// Number of recomputes of any field on `instance`.
    pub fn recomputes_of(&self, instance: &str) -> usize {
        self.recomputed.iter().filter(|(key, _)| key.as_str() == instance).count()
    }

    /// Number of times `instance` was persisted.
    pub fn persist_count(&self, instance: &str) -> usize {
        self.persisted.iter().filter(|key| key.as_str() == instance).count()
    }

    /// True when the pair `source → dependent` was cascaded.
    pub fn cascaded(&self, source: &str, dependent: &str) -> bool {
        self.edges.iter().any(|(s, d)| s.as_str() == source && d.as_str() == dependent)
    }
}

/// State of one top-level write.
#[derive(Debug)]
pub struct PropagationSession {
    id: Uuid,
    trigger: Trigger,
    visited: HashSet<(InstanceKey, InstanceKey)>,
    enforced: HashMap<InstanceKey, BTreeSet<String>>,
    removed: HashSet<InstanceKey>,
    depth: usize,
    report: CascadeReport,
}

impl PropagationSession {
    /// Start a session.
    pub fn new(trigger: Trigger) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            trigger,
            visited: HashSet::new(),
            enforced: HashMap::new(),
            removed: HashSet::new(),
            depth: 0,
            report: CascadeReport {
                session: id,
                trigger,
                recomputed: Vec::new(),
                edges: Vec::new(),
                persisted: Vec::new(),
                max_depth: 0,
            },
        }
    }

    /// Session identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// What started the session.
    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    /// Mark `source → dependent` visited.
    ///
    /// Returns `false`, and changes nothing, when the pair was already
    /// visited in this session.
    pub fn visit(&mut self, source: &InstanceKey, dependent: &InstanceKey) -> bool {
        let pair = (source.clone(), dependent.clone());
        if self.visited.contains(&pair) {
            return false;
        }
        self.visited.insert(pair);
        self.report.edges.push((source.clone(), dependent.clone()));
        true
    }

    /// Number of pairs visited so far.
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Force recompute of the fields of `instance` over `relations`.
    pub fn enforce(&mut self, instance: InstanceKey, relations: BTreeSet<String>) {
        self.enforced.insert(instance, relations);
    }

    /// Drop the enforced flag of `instance`.
    pub fn release(&mut self, instance: &InstanceKey) {
        self.enforced.remove(instance);
    }

    /// True when `instance` is being re-saved by a cascade.
    pub fn is_enforced(&self, instance: &InstanceKey) -> bool {
        self.enforced.contains_key(instance)
    }

    /// True when fields of `instance` over `relation` must be recomputed
    /// regardless of modification state.
    pub fn is_enforced_for(&self, instance: &InstanceKey, relation: &str) -> bool {
        self.enforced.get(instance).is_some_and(|relations| relations.contains(relation))
    }

    /// Record that `instance` was removed by this write.
    pub fn mark_removed(&mut self, instance: InstanceKey) {
        self.removed.insert(instance);
    }

    /// True when `instance` was removed by this write.
    pub fn is_removed(&self, instance: &InstanceKey) -> bool {
        self.removed.contains(instance)
    }

    /// Current nesting depth of cascaded saves.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn enter(&mut self) {
        self.depth += 1;
        self.report.max_depth = self.report.max_depth.max(self.depth);
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn record_recompute(&mut self, instance: InstanceKey, field: &str) {
        self.report.recomputed.push((instance, field.to_string()));
    }

    pub(crate) fn record_persist(&mut self, instance: InstanceKey) {
        self.report.persisted.push(instance);
    }

    /// Report of what has happened so far.
    pub fn report(&self) -> &CascadeReport {
        &self.report
    }

    /// End the session.
    pub fn into_report(self) -> CascadeReport {
        self.report
    }
}
