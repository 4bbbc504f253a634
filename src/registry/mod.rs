//! Explicit registry of declared collections.
//!
//! The [`Registry`] is populated once, while collections are declared, and is
//! read-only afterwards: the cascade engine holds it behind an `Arc` and every
//! propagation session shares it. Declaring a collection
//!
//! 1. validates each denormalized field ([`FieldSpecification::declare`]),
//! 2. resolves the collection each field copies from, following list and map
//!    wrappers of the relation field type down to its reference target,
//! 3. records a `source → dependent` edge and its join binding in the
//!    [`DependencyGraph`].
//!
//! Resolution fails fast: a relation path that does not lead to a reference is
//! a declaration error, not a silently missing edge. Nothing is registered
//! when any field of a declaration fails.
//!
//! ```rust
//! use denorm_cascade::field::FieldOptions;
//! use denorm_cascade::registry::{CollectionSchema, FieldType, Registry};
//! use serde_json::json;
//!
//! let mut registry = Registry::new();
//! registry.declare(CollectionSchema::new("Author").field("name", FieldType::Scalar)).unwrap();
//! registry
//!     .declare(
//!         CollectionSchema::new("Book")
//!             .field("author", FieldType::reference("Author"))
//!             .denormalize("authorSnapshot", FieldOptions::external("author").paths(json!(["name"]))),
//!     )
//!     .unwrap();
//!
//! assert_eq!(registry.graph().dependents("Author"), vec!["Book"]);
//! ```

pub mod dependency_graph;
pub mod schema;

pub use dependency_graph::{DependencyGraph, JoinBinding};
pub use schema::{CollectionSchema, FieldType};

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

use crate::core::DenormError;
use crate::field::{CasterRegistry, FieldMode, FieldSpecification, RelationShape};

/// A denormalized field together with its resolved relation.
#[derive(Debug, Clone)]
pub struct ResolvedField {
    spec: FieldSpecification,
    target: String,
    shape: RelationShape,
}

impl ResolvedField {
    /// The validated declaration.
    pub fn spec(&self) -> &FieldSpecification {
        &self.spec
    }

    /// Collection the field copies from.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Cardinality of the relation.
    pub fn shape(&self) -> RelationShape {
        self.shape
    }

    /// Declared key.
    pub fn key(&self) -> &str {
        self.spec.key()
    }

    /// Relation path.
    pub fn from(&self) -> &str {
        self.spec.from()
    }

    /// Destination path.
    pub fn to(&self) -> &str {
        self.spec.to()
    }
}

/// A declared collection.
#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    fields: IndexMap<String, FieldType>,
    denormalized: Vec<ResolvedField>,
}

impl Collection {
    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type of `path`, including relations registered by
    /// internal-mode fields.
    pub fn field_type(&self, path: &str) -> Option<&FieldType> {
        self.fields.get(path)
    }

    /// Denormalized fields in declaration order.
    pub fn denormalized(&self) -> &[ResolvedField] {
        &self.denormalized
    }

    /// Denormalized field declared under `key`.
    pub fn denormalized_field(&self, key: &str) -> Option<&ResolvedField> {
        self.denormalized.iter().find(|field| field.key() == key)
    }
}

/// Registry of collections and the dependency graph between them.
#[derive(Debug, Default)]
pub struct Registry {
    casters: CasterRegistry,
    collections: HashMap<String, Collection>,
    graph: DependencyGraph,
}

impl Registry {
    /// Empty registry with the primitive casters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty registry resolving `of` names through `casters`.
    pub fn with_casters(casters: CasterRegistry) -> Self {
        Self {
            casters,
            ..Self::default()
        }
    }

    /// Casters used for internal-mode fields declared from now on.
    pub fn casters_mut(&mut self) -> &mut CasterRegistry {
        &mut self.casters
    }

    /// Declare a collection and register its dependency edges.
    pub fn declare(&mut self, schema: CollectionSchema) -> Result<&Collection, DenormError> {
        let CollectionSchema {
            name,
            mut fields,
            denormalize,
        } = schema;

        if self.collections.contains_key(&name) {
            return Err(DenormError::DuplicateCollection { name });
        }

        let mut specs = Vec::with_capacity(denormalize.len());
        let mut destinations = HashSet::new();
        for (key, options) in denormalize {
            let spec = FieldSpecification::declare(key, options, &self.casters)?;
            if !destinations.insert(spec.to().to_string()) {
                return Err(DenormError::DuplicateField {
                    collection: name,
                    key: spec.to().to_string(),
                });
            }
            // Internal-mode fields are relations themselves
            if let FieldMode::Internal { target, shape } = spec.mode() {
                fields
                    .entry(spec.key().to_string())
                    .or_insert_with(|| FieldType::shaped(*shape, target.clone()));
            }
            specs.push(spec);
        }

        let denormalized = specs
            .into_iter()
            .map(|spec| resolve_field(&name, &fields, spec))
            .collect::<Result<Vec<_>, _>>()?;

        for field in &denormalized {
            self.graph.add_binding(
                field.target(),
                &name,
                JoinBinding::new(field.from(), field.to()),
            );
            tracing::debug!(
                "Registered denormalization edge {} -> {} ({} -> {})",
                field.target(),
                name,
                field.from(),
                field.to()
            );
        }

        if let Some(cycle) = self.graph.find_cycle() {
            if cycle.contains(&name) {
                tracing::warn!(
                    "Cyclic denormalization between collections: {}",
                    cycle.join(" → ")
                );
            }
        }

        let collection = Collection {
            name: name.clone(),
            fields,
            denormalized,
        };
        Ok(self.collections.entry(name).or_insert(collection))
    }

    /// Look up a declared collection.
    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    /// Look up a declared collection, failing with
    /// [`DenormError::UnknownCollection`].
    pub fn require(&self, name: &str) -> Result<&Collection, DenormError> {
        self.collection(name).ok_or_else(|| DenormError::UnknownCollection {
            name: name.to_string(),
        })
    }

    /// Names of all declared collections, sorted.
    pub fn collection_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.collections.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Dependency graph between collections.
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }
}

fn resolve_field(
    collection: &str,
    fields: &IndexMap<String, FieldType>,
    spec: FieldSpecification,
) -> Result<ResolvedField, DenormError> {
    let (target, shape) = match spec.mode() {
        FieldMode::Internal { target, shape } => (target.clone(), *shape),
        FieldMode::External => {
            let field_type = fields.get(spec.from());
            match field_type.and_then(|ty| ty.target().map(|target| (target, ty.shape()))) {
                Some((target, shape)) => (target.to_string(), shape),
                None => {
                    return Err(DenormError::UnresolvedRelation {
                        collection: collection.to_string(),
                        path: spec.from().to_string(),
                    });
                }
            }
        }
    };

    Ok(ResolvedField {
        spec,
        target,
        shape,
    })
}
