//! Path specification compiler.
//!
//! A denormalized field declares *which* sub-fields of the referenced record
//! to copy and *where* to place them in the destination object. The
//! declaration is written either as a list of dotted paths or as a nested
//! mapping, and this module flattens it into an ordered list of
//! [`PathMapping`]s.
//!
//! # Accepted forms
//!
//! ## List form
//!
//! ```text
//! ["name", "address.city", "address.zip:postcode"]
//! ```
//!
//! - `"a.b"` copies `a.b` to `a.b`
//! - `"a.b:x.y"` copies `a.b` to `a.x.y` (only the last segment is renamed)
//! - nested lists or mappings inside the list are flattened in place
//!
//! ## Mapping form
//!
//! ```text
//! { "name": true, "address": { "city": 1, "zip": "postcode" } }
//! ```
//!
//! - a boolean or number leaf keeps the key as source and destination
//! - a string leaf renames the destination leaf
//! - a nested mapping or list is prefixed with its parent key
//!
//! # Ordering
//!
//! The compiled list is sorted by ascending depth of `get` (stable, so ties
//! keep declaration order). Destination objects are built lazily, so a
//! shallow write must never come after a deeper write into the same branch.
//!
//! # Examples
//!
//! ```rust
//! use denorm_cascade::paths::{PathMapping, compile_paths};
//! use serde_json::json;
//!
//! let mappings = compile_paths(Some(&json!(["a.b.c:x", "name"]))).unwrap();
//! assert_eq!(
//!     mappings,
//!     vec![PathMapping::new("name", "name"), PathMapping::new("a.b.c", "a.b.x")]
//! );
//! ```

pub mod access;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::core::DenormError;

/// One source-to-destination copy instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathMapping {
    /// Dotted path read from the referenced record.
    pub get: String,
    /// Dotted path written into the destination object.
    pub set: String,
}

impl PathMapping {
    /// Create a mapping from explicit paths.
    pub fn new(get: impl Into<String>, set: impl Into<String>) -> Self {
        Self {
            get: get.into(),
            set: set.into(),
        }
    }

    /// Number of dot-separated segments in `get`.
    pub fn depth(&self) -> usize {
        access::segments(&self.get).count()
    }

    /// Parse a flattened `source[:dest]` token.
    ///
    /// Without a destination the mapping copies to the same path. With one,
    /// only the last segment of `get` is replaced by `dest`.
    pub fn parse(token: &str) -> Result<Self, DenormError> {
        let mut parts = token.split(':');
        let get = parts.next().unwrap_or_default();
        let dest = parts.next();

        if parts.next().is_some() {
            return Err(DenormError::invalid_paths(format!(
                "contains '{token}' with more than one ':' separator"
            )));
        }
        validate_path(get, token)?;

        let set = match dest {
            None => get.to_string(),
            Some(dest) => {
                validate_path(dest, token)?;
                match get.rsplit_once('.') {
                    Some((parent, _)) => format!("{parent}.{dest}"),
                    None => dest.to_string(),
                }
            }
        };

        Ok(Self {
            get: get.to_string(),
            set,
        })
    }
}

impl fmt::Display for PathMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.get, self.set)
    }
}

fn validate_path(path: &str, token: &str) -> Result<(), DenormError> {
    if path.is_empty() {
        return Err(DenormError::invalid_paths(format!("contains '{token}' with an empty path")));
    }
    if access::segments(path).any(str::is_empty) {
        return Err(DenormError::invalid_paths(format!(
            "contains '{token}' with an empty path segment"
        )));
    }
    Ok(())
}

/// Compile a raw path specification into ordered mappings.
///
/// `None` compiles to an empty list (the field copies nothing).
pub fn compile_paths(spec: Option<&Value>) -> Result<Vec<PathMapping>, DenormError> {
    let Some(spec) = spec else {
        return Ok(Vec::new());
    };

    let tokens = match spec {
        Value::Array(_) | Value::Object(_) => flatten(spec)?,
        other => {
            return Err(DenormError::invalid_paths(format!(
                "have to be an Array<string> or Object<string>, got {}",
                kind_of(other)
            )));
        }
    };

    let mut mappings =
        tokens.iter().map(|token| PathMapping::parse(token)).collect::<Result<Vec<_>, _>>()?;
    mappings.sort_by_key(PathMapping::depth);
    Ok(mappings)
}

/// Flatten a list or mapping into `source[:dest]` tokens, in declaration order.
fn flatten(spec: &Value) -> Result<Vec<String>, DenormError> {
    match spec {
        Value::Array(entries) => {
            let mut tokens = Vec::with_capacity(entries.len());
            for entry in entries {
                match entry {
                    Value::String(path) => tokens.push(path.clone()),
                    Value::Array(_) | Value::Object(_) => tokens.extend(flatten(entry)?),
                    other => {
                        return Err(DenormError::invalid_paths(format!(
                            "list entries have to be strings or nested specs, got {}",
                            kind_of(other)
                        )));
                    }
                }
            }
            Ok(tokens)
        }
        Value::Object(entries) => {
            let mut tokens = Vec::with_capacity(entries.len());
            for (key, value) in entries {
                match value {
                    Value::Array(_) | Value::Object(_) => {
                        tokens.extend(flatten(value)?.into_iter().map(|inner| format!("{key}.{inner}")));
                    }
                    Value::Bool(_) | Value::Number(_) => tokens.push(key.clone()),
                    Value::String(dest) => tokens.push(format!("{key}:{dest}")),
                    Value::Null => {
                        return Err(DenormError::invalid_paths(format!(
                            "key '{key}' has to be true, a number, a string or a nested spec, got null"
                        )));
                    }
                }
            }
            Ok(tokens)
        }
        other => Err(DenormError::invalid_paths(format!(
            "have to be an Array<string> or Object<string>, got {}",
            kind_of(other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
