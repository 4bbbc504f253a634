//! Error types for denormalized field declaration and cascade propagation
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** ([`DenormError`]) for every failure the crate itself
//!    can detect, so callers can match on the exact condition
//! 2. **Contextual chains** built with [`anyhow::Context`] while a cascade unwinds, so
//!    the top-level caller sees which record, field and edge were being processed
//!
//! # Error Categories
//!
//! - **Declaration**: [`DenormError::InvalidPaths`], [`DenormError::MissingFrom`],
//!   [`DenormError::MissingRef`], [`DenormError::MissingSuffix`],
//!   [`DenormError::UnknownCaster`], [`DenormError::InvalidOf`]
//! - **Registration**: [`DenormError::UnresolvedRelation`],
//!   [`DenormError::DuplicateCollection`], [`DenormError::DuplicateField`],
//!   [`DenormError::UnknownCollection`]
//! - **Recompute**: [`DenormError::Cast`], [`DenormError::RelatedNotFound`],
//!   [`DenormError::InvalidReference`]
//!
//! Collaborator failures (fetch, query, persist) are reported as
//! [`StoreError`](crate::store::StoreError) and wrapped with the same context.
//!
//! # Examples
//!
//! ```rust
//! use denorm_cascade::core::DenormError;
//!
//! let error = DenormError::MissingRef { key: "tags".to_string() };
//! assert_eq!(
//!     error.to_string(),
//!     "Denormalize: 'ref' option in 'tags' field has to be not empty String"
//! );
//! ```
//!
//! Finding the typed error inside a propagation failure:
//!
//! ```rust
//! use anyhow::Context;
//! use denorm_cascade::core::{DenormError, find_denorm_error};
//!
//! let failure = Err::<(), _>(DenormError::Cast {
//!     value: "abc".to_string(),
//!     reason: "NaN".to_string(),
//! })
//! .context("Failed to recompute 'Book:1' field 'priceData'")
//! .unwrap_err();
//!
//! assert!(matches!(find_denorm_error(&failure), Some(DenormError::Cast { .. })));
//! ```

use thiserror::Error;

/// The main error type for denormalization operations
///
/// Each variant names one failure mode. Declaration variants carry the field
/// key they were raised for so a schema author can find the offending option.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DenormError {
    /// The `paths` option is not an array or keyed mapping, or contains a
    /// literal the path compiler cannot interpret.
    #[error("Denormalize: 'paths' option in '{key}' field {reason}")]
    InvalidPaths {
        /// Field key the paths were declared on (empty when compiled standalone)
        key: String,
        /// What was wrong with the declaration
        reason: String,
    },

    /// External mode without a `from` relation path.
    #[error(
        "Denormalize: 'from' option in '{key}' field has to be not empty path to existing field with ref"
    )]
    MissingFrom {
        /// Field key
        key: String,
    },

    /// Internal mode without a `ref` target collection.
    #[error("Denormalize: 'ref' option in '{key}' field has to be not empty String")]
    MissingRef {
        /// Field key
        key: String,
    },

    /// Internal mode with neither `to` nor a non-empty `suffix`.
    #[error("Denormalize: 'suffix' option in '{key}' field has to be not empty String")]
    MissingSuffix {
        /// Field key
        key: String,
    },

    /// `of` is present but empty.
    #[error("Denormalize: 'of' option in '{key}' field has to constructor or type in string")]
    InvalidOf {
        /// Field key
        key: String,
    },

    /// `of` names a type that is neither a primitive nor a registered constructor.
    #[error("Denormalize: 'of' option in '{key}' field There is no '{name}' type")]
    UnknownCaster {
        /// Field key
        key: String,
        /// The unresolvable type name
        name: String,
    },

    /// A caster produced a non-finite number or could not coerce the value.
    #[error("Denormalize: '{value}' illegal cast to {reason}")]
    Cast {
        /// Rendered input value
        value: String,
        /// `NaN`, `Infinite`, or a caster-specific description
        reason: String,
    },

    /// A relation path does not resolve to a declared reference target.
    #[error("Relation '{path}' on collection '{collection}' does not resolve to a referenced collection")]
    UnresolvedRelation {
        /// Collection declaring the relation
        collection: String,
        /// Relation path
        path: String,
    },

    /// A collection name was declared twice.
    #[error("Collection '{name}' is already declared")]
    DuplicateCollection {
        /// Collection name
        name: String,
    },

    /// Two denormalized fields on one collection share a key or destination.
    #[error("Collection '{collection}' declares denormalized field '{key}' more than once")]
    DuplicateField {
        /// Collection name
        collection: String,
        /// Conflicting key or destination path
        key: String,
    },

    /// A record names a collection the registry has never seen.
    #[error("Collection '{name}' is not declared")]
    UnknownCollection {
        /// Collection name
        name: String,
    },

    /// A referenced record could not be fetched from the store.
    #[error("Related record '{collection}:{id}' referenced by '{path}' was not found")]
    RelatedNotFound {
        /// Target collection
        collection: String,
        /// Target id
        id: String,
        /// Relation path on the referencing record
        path: String,
    },

    /// A relation field holds something other than a reference of the
    /// declared shape.
    #[error("Relation '{path}' holds an invalid reference: {reason}")]
    InvalidReference {
        /// Relation path
        path: String,
        /// What was found instead
        reason: String,
    },
}

impl DenormError {
    /// Shorthand for an [`DenormError::InvalidPaths`] raised while compiling a
    /// standalone path specification.
    pub fn invalid_paths(reason: impl Into<String>) -> Self {
        Self::InvalidPaths {
            key: String::new(),
            reason: reason.into(),
        }
    }

    /// Attach the declaring field key to an [`DenormError::InvalidPaths`].
    ///
    /// Other variants are returned unchanged.
    #[must_use]
    pub fn for_key(self, field: &str) -> Self {
        match self {
            Self::InvalidPaths { reason, .. } => Self::InvalidPaths {
                key: field.to_string(),
                reason,
            },
            other => other,
        }
    }

    /// True for errors raised while a record type is declared.
    pub fn is_declaration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPaths { .. }
                | Self::MissingFrom { .. }
                | Self::MissingRef { .. }
                | Self::MissingSuffix { .. }
                | Self::InvalidOf { .. }
                | Self::UnknownCaster { .. }
                | Self::UnresolvedRelation { .. }
                | Self::DuplicateCollection { .. }
                | Self::DuplicateField { .. }
        )
    }
}

/// Walk an [`anyhow::Error`] chain and return the first [`DenormError`] in it.
pub fn find_denorm_error(error: &anyhow::Error) -> Option<&DenormError> {
    error.chain().find_map(|cause| cause.downcast_ref::<DenormError>())
}
