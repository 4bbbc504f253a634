//! Recompute of one denormalized field on one record.
//!
//! Recompute reads the record but never mutates it: it returns the new value
//! of the field's destination path (and, for internal-mode fields, the cast
//! relation value) and the engine applies the results once every field of the
//! record has been recomputed. A failing field therefore leaves the record
//! untouched.
//!
//! Related records are materialized from [`Record::populated`] when the caller
//! attached them, otherwise fetched from the store for the duration of the
//! recompute only. Fetched bodies are never attached to the record, so a
//! persisted record keeps its reference-only form.

use anyhow::{Context, Result};
use futures::{FutureExt, StreamExt, TryStreamExt, stream};
use serde_json::{Map, Value};

use super::session::PropagationSession;
use crate::constants::RELATED_FETCH_CONCURRENCY;
use crate::core::{DenormError, InstanceKey, Record, RecordId, RelatedValue};
use crate::field::RelationShape;
use crate::paths::PathMapping;
use crate::paths::access::{get_path, set_path};
use crate::registry::ResolvedField;
use crate::store::DocumentStore;

/// New values produced for one field.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Recomputed {
    /// Value for the field's `to` path.
    pub destination: Value,
    /// Cast relation value for internal-mode fields, written back to `from`.
    pub relation: Option<Value>,
}

/// References held by a relation field, by cardinality.
#[derive(Debug, Clone, PartialEq)]
enum References {
    Single(Option<RecordId>),
    Sequence(Vec<RecordId>),
    Keyed(Vec<(String, RecordId)>),
}

/// Recompute `field` for `record`.
pub(crate) async fn recompute<S>(
    store: &S,
    record: &Record,
    field: &ResolvedField,
    session: &PropagationSession,
) -> Result<Recomputed>
where
    S: DocumentStore + ?Sized,
{
    let relation = if field.spec().is_internal() {
        record.get(field.from()).map(|value| cast_relation(field, value)).transpose()?
    } else {
        None
    };
    let references = match &relation {
        Some(cast) => references(field, Some(cast))?,
        None => references(field, record.get(field.from()))?,
    };

    let related = match record.populated(field.from()) {
        Some(populated) => populated.clone(),
        None => fetch_related(store, field, references, session).await?,
    };

    Ok(Recomputed {
        destination: project_related(&related, field.spec().paths()),
        relation,
    })
}

/// Apply the field's caster to every stored reference, keeping the container.
fn cast_relation(field: &ResolvedField, value: &Value) -> Result<Value, DenormError> {
    match (field.shape(), value) {
        (RelationShape::Sequence, Value::Array(items)) => {
            items.iter().map(|item| field.spec().cast(item)).collect::<Result<Vec<_>, _>>().map(Value::Array)
        }
        (RelationShape::KeyedCollection, Value::Object(entries)) => entries
            .iter()
            .map(|(key, item)| field.spec().cast(item).map(|cast| (key.clone(), cast)))
            .collect::<Result<Map<_, _>, _>>()
            .map(Value::Object),
        _ => field.spec().cast(value),
    }
}

fn references(field: &ResolvedField, value: Option<&Value>) -> Result<References, DenormError> {
    let value = match value {
        None | Some(Value::Null) => {
            return Ok(match field.shape() {
                RelationShape::Single => References::Single(None),
                RelationShape::Sequence => References::Sequence(Vec::new()),
                RelationShape::KeyedCollection => References::Keyed(Vec::new()),
            });
        }
        Some(value) => value,
    };

    match (field.shape(), value) {
        (RelationShape::Single, value) => Ok(References::Single(reference_id(field, value)?)),
        (RelationShape::Sequence, Value::Array(items)) => {
            let mut ids = Vec::with_capacity(items.len());
            for item in items {
                ids.extend(reference_id(field, item)?);
            }
            Ok(References::Sequence(ids))
        }
        (RelationShape::KeyedCollection, Value::Object(entries)) => {
            let mut ids = Vec::with_capacity(entries.len());
            for (key, item) in entries {
                if let Some(id) = reference_id(field, item)? {
                    ids.push((key.clone(), id));
                }
            }
            Ok(References::Keyed(ids))
        }
        (RelationShape::Sequence, other) => Err(invalid_reference(field, "an array", other)),
        (RelationShape::KeyedCollection, other) => Err(invalid_reference(field, "an object", other)),
    }
}

fn reference_id(field: &ResolvedField, value: &Value) -> Result<Option<RecordId>, DenormError> {
    if value.is_null() {
        return Ok(None);
    }
    RecordId::from_reference(value)
        .map(Some)
        .ok_or_else(|| invalid_reference(field, "a record id", value))
}

fn invalid_reference(field: &ResolvedField, expected: &str, found: &Value) -> DenormError {
    DenormError::InvalidReference {
        path: field.from().to_string(),
        reason: format!("expected {expected}, found {found}"),
    }
}

async fn fetch_related<S>(
    store: &S,
    field: &ResolvedField,
    references: References,
    session: &PropagationSession,
) -> Result<RelatedValue>
where
    S: DocumentStore + ?Sized,
{
    Ok(match references {
        References::Single(None) => RelatedValue::Single(None),
        References::Single(Some(id)) => RelatedValue::Single(fetch_one(store, field, id, session).await?),
        References::Sequence(ids) => {
            let bodies: Vec<Option<Value>> = stream::iter(ids)
                .map(|id| fetch_one(store, field, id, session).boxed())
                .buffered(RELATED_FETCH_CONCURRENCY)
                .try_collect()
                .await?;
            RelatedValue::Sequence(bodies.into_iter().flatten().collect())
        }
        References::Keyed(entries) => {
            let bodies: Vec<Option<(String, Value)>> = stream::iter(entries)
                .map(|(key, id)| {
                    async move {
                        let body = fetch_one(store, field, id, session).await?;
                        Ok::<_, anyhow::Error>(body.map(|body| (key, body)))
                    }
                    .boxed()
                })
                .buffered(RELATED_FETCH_CONCURRENCY)
                .try_collect()
                .await?;
            RelatedValue::Keyed(bodies.into_iter().flatten().collect())
        }
    })
}

/// Body of one referenced record. `None` when the record was removed by the
/// current session.
async fn fetch_one<S>(
    store: &S,
    field: &ResolvedField,
    id: RecordId,
    session: &PropagationSession,
) -> Result<Option<Value>>
where
    S: DocumentStore + ?Sized,
{
    if session.is_removed(&InstanceKey::new(field.target(), &id)) {
        return Ok(None);
    }

    let related = store
        .fetch(field.target(), &id)
        .await
        .with_context(|| format!("Failed to fetch {}:{} through '{}'", field.target(), id, field.from()))?;

    match related {
        Some(record) => Ok(Some(record.into_body())),
        None => Err(DenormError::RelatedNotFound {
            collection: field.target().to_string(),
            id: id.to_string(),
            path: field.from().to_string(),
        }
        .into()),
    }
}

/// Build the destination value from materialized targets.
pub(crate) fn project_related(related: &RelatedValue, paths: &[PathMapping]) -> Value {
    match related {
        RelatedValue::Single(None) => Value::Null,
        RelatedValue::Single(Some(body)) => project(body, paths),
        RelatedValue::Sequence(bodies) => Value::Array(bodies.iter().map(|body| project(body, paths)).collect()),
        RelatedValue::Keyed(entries) => Value::Object(
            entries
                .iter()
                .map(|(key, body)| (key.clone(), project(body, paths)))
                .collect(),
        ),
    }
}

/// Copy every mapping of `paths` from `body` into a fresh object.
///
/// `paths` is ordered shallow to deep so a deeper `set` lands inside a value
/// copied by a shallower one. Paths missing from `body` are skipped.
pub(crate) fn project(body: &Value, paths: &[PathMapping]) -> Value {
    let mut destination = Value::Object(Map::new());
    for mapping in paths {
        if let Some(value) = get_path(body, &mapping.get) {
            set_path(&mut destination, &mapping.set, value.clone());
        }
    }
    destination
}
