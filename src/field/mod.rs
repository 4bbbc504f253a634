//! Denormalized field declarations.
//!
//! A [`FieldSpecification`] describes one denormalized field on a collection:
//! the relation it copies from, where the copy is stored, which sub-fields are
//! copied, and how stored references are cast. It is built once from
//! [`FieldOptions`] when the owning collection is declared and never changes
//! afterwards.
//!
//! # Declaration modes
//!
//! - **External** (`from` given): the field holds a copy of data reached
//!   through a sibling relation field. The copy is stored at the field key.
//! - **Internal** (`of` given): the field itself stores references to `ref`
//!   records, cast through the `of` type. The copy is stored at `to`, or at
//!   `<key><suffix>`.
//!
//! ```rust
//! use denorm_cascade::field::{CasterRegistry, FieldOptions, FieldSpecification};
//! use serde_json::json;
//!
//! let casters = CasterRegistry::new();
//!
//! let snapshot = FieldSpecification::declare(
//!     "authorSnapshot",
//!     FieldOptions::external("author").paths(json!(["name"])),
//!     &casters,
//! )
//! .unwrap();
//! assert_eq!(snapshot.from(), "author");
//! assert_eq!(snapshot.to(), "authorSnapshot");
//!
//! let tags = FieldSpecification::declare(
//!     "tags",
//!     FieldOptions::internal("ObjectId", "Tag").paths(json!(["label"])),
//!     &casters,
//! )
//! .unwrap();
//! assert_eq!(tags.from(), "tags");
//! assert_eq!(tags.to(), "tagsData");
//! ```

pub mod caster;

pub use caster::{CastOutput, Caster, CasterRegistry};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::DEFAULT_SUFFIX;
use crate::core::DenormError;
use crate::paths::{PathMapping, compile_paths};

/// Cardinality of a relation field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationShape {
    /// One reference; the copy is one object.
    Single,
    /// Ordered references; the copy is an array of objects in the same order.
    Sequence,
    /// Keyed references; the copy is an object with the same keys.
    KeyedCollection,
}

/// Raw options of a denormalized field, as written in a declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldOptions {
    /// Relation path on the owning collection (external mode).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Destination path (internal mode).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Element type name of stored references (internal mode).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub of: Option<String>,
    /// Target collection of stored references (internal mode).
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Destination suffix for internal mode; defaults to `Data`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// Raw path specification, compiled with [`compile_paths`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<Value>,
    /// Container shape of an internal-mode field; defaults to a sequence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<RelationShape>,
}

impl FieldOptions {
    /// Options for an external-mode field copying through `from`.
    pub fn external(from: impl Into<String>) -> Self {
        Self {
            from: Some(from.into()),
            ..Self::default()
        }
    }

    /// Options for an internal-mode field storing `of` references to `reference`.
    pub fn internal(of: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            of: Some(of.into()),
            reference: Some(reference.into()),
            ..Self::default()
        }
    }

    /// Set the path specification.
    #[must_use]
    pub fn paths(mut self, paths: Value) -> Self {
        self.paths = Some(paths);
        self
    }

    /// Set the destination path.
    #[must_use]
    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    /// Set the destination suffix.
    #[must_use]
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Set the container shape of an internal-mode field.
    #[must_use]
    pub fn shape(mut self, shape: RelationShape) -> Self {
        self.shape = Some(shape);
        self
    }
}

/// How a denormalized field obtains its references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMode {
    /// Copies through a sibling relation field.
    External,
    /// Stores its own references to `target`, in the given container shape.
    Internal {
        /// Target collection named by `ref`
        target: String,
        /// Container shape of the stored references
        shape: RelationShape,
    },
}

/// A validated denormalized field.
#[derive(Debug, Clone)]
pub struct FieldSpecification {
    key: String,
    mode: FieldMode,
    from: String,
    to: String,
    paths: Vec<PathMapping>,
    caster: Caster,
}

impl FieldSpecification {
    /// Validate `options` for the field named `key` and compile its paths.
    pub fn declare(
        key: impl Into<String>,
        options: FieldOptions,
        casters: &CasterRegistry,
    ) -> Result<Self, DenormError> {
        let key = key.into();
        let paths = compile_paths(options.paths.as_ref()).map_err(|e| e.for_key(&key))?;

        if let Some(of) = options.of.as_deref() {
            let suffix = options.suffix.as_deref().unwrap_or(DEFAULT_SUFFIX);
            let to = match options.to.as_deref().filter(|to| !to.is_empty()) {
                Some(to) => to.to_string(),
                None if !suffix.is_empty() => format!("{key}{suffix}"),
                None => return Err(DenormError::MissingSuffix { key }),
            };

            let Some(target) = options.reference.filter(|r| !r.is_empty()) else {
                return Err(DenormError::MissingRef { key });
            };

            if of.is_empty() {
                return Err(DenormError::InvalidOf { key });
            }
            let caster = casters.resolve(&key, of)?;

            return Ok(Self {
                from: key.clone(),
                key,
                mode: FieldMode::Internal {
                    target,
                    shape: options.shape.unwrap_or(RelationShape::Sequence),
                },
                to,
                paths,
                caster,
            });
        }

        let Some(from) = options.from.filter(|from| !from.is_empty()) else {
            return Err(DenormError::MissingFrom { key });
        };

        Ok(Self {
            to: key.clone(),
            key,
            mode: FieldMode::External,
            from,
            paths,
            caster: Caster::Passthrough,
        })
    }

    /// Declared field key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Declaration mode.
    pub fn mode(&self) -> &FieldMode {
        &self.mode
    }

    /// True for internal-mode fields.
    pub fn is_internal(&self) -> bool {
        matches!(self.mode, FieldMode::Internal { .. })
    }

    /// Relation path holding the references.
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Destination path of the copy.
    pub fn to(&self) -> &str {
        &self.to
    }

    /// Compiled mappings, shallow to deep.
    pub fn paths(&self) -> &[PathMapping] {
        &self.paths
    }

    /// Caster applied to stored references.
    pub fn caster(&self) -> &Caster {
        &self.caster
    }

    /// Cast one stored reference.
    pub fn cast(&self, value: &Value) -> Result<Value, DenormError> {
        self.caster.cast(value)
    }
}
