//! Collection schema declarations.
//!
//! The crate does not own a type system; it only needs to know which fields
//! of a collection are relations (and to what), and which fields are
//! denormalized. [`CollectionSchema`] carries exactly that, either built in
//! code or deserialized from a declaration file:
//!
//! ```toml
//! name = "Book"
//!
//! [fields]
//! title = "scalar"
//! author = { ref = "Author" }
//! reviewers = { array = { ref = "User" } }
//!
//! [denormalize.authorSnapshot]
//! from = "author"
//! paths = ["name"]
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::field::{FieldOptions, RelationShape};

/// Declared type of a collection field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// A plain value.
    Scalar,
    /// A reference to a record of the named collection.
    Ref(String),
    /// An ordered list of the inner type.
    Array(Box<FieldType>),
    /// A keyed collection of the inner type.
    Map(Box<FieldType>),
}

impl FieldType {
    /// A single reference to `collection`.
    pub fn reference(collection: impl Into<String>) -> Self {
        Self::Ref(collection.into())
    }

    /// A list of `inner`.
    pub fn array_of(inner: FieldType) -> Self {
        Self::Array(Box::new(inner))
    }

    /// A keyed collection of `inner`.
    pub fn map_of(inner: FieldType) -> Self {
        Self::Map(Box::new(inner))
    }

    /// Wrap a reference to `collection` in the container for `shape`.
    pub fn shaped(shape: RelationShape, collection: impl Into<String>) -> Self {
        let reference = Self::reference(collection);
        match shape {
            RelationShape::Single => reference,
            RelationShape::Sequence => Self::array_of(reference),
            RelationShape::KeyedCollection => Self::map_of(reference),
        }
    }

    /// Referenced collection, looking through list and map wrappers.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Scalar => None,
            Self::Ref(target) => Some(target),
            Self::Array(inner) | Self::Map(inner) => inner.target(),
        }
    }

    /// Cardinality, decided by the outermost wrapper.
    pub fn shape(&self) -> RelationShape {
        match self {
            Self::Array(_) => RelationShape::Sequence,
            Self::Map(_) => RelationShape::KeyedCollection,
            Self::Scalar | Self::Ref(_) => RelationShape::Single,
        }
    }
}

/// Declaration of one collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionSchema {
    /// Collection name.
    pub name: String,
    /// Field types by dotted path, in declaration order.
    #[serde(default)]
    pub fields: IndexMap<String, FieldType>,
    /// Denormalized fields by key, in declaration order.
    #[serde(default)]
    pub denormalize: IndexMap<String, FieldOptions>,
}

impl CollectionSchema {
    /// Start a declaration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declare a field type.
    #[must_use]
    pub fn field(mut self, path: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.insert(path.into(), field_type);
        self
    }

    /// Declare a denormalized field.
    #[must_use]
    pub fn denormalize(mut self, key: impl Into<String>, options: FieldOptions) -> Self {
        self.denormalize.insert(key.into(), options);
        self
    }

    /// Parse a declaration from TOML.
    pub fn from_toml_str(source: &str) -> anyhow::Result<Self> {
        let schema: Self = toml::from_str(source)?;
        Ok(schema)
    }
}
