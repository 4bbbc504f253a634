//! Value casting for internal-mode denormalized fields.
//!
//! Internal-mode fields store references whose element type is named by the
//! `of` option. Before a reference is used it is coerced through a [`Caster`]
//! resolved from a [`CasterRegistry`]. Numeric results are checked: `NaN` and
//! infinities are rejected with [`DenormError::Cast`].

use serde_json::{Number, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::core::DenormError;

/// Result of a user-registered constructor.
///
/// Numbers are reported as raw `f64` so non-finite results can be detected
/// before they are turned into JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum CastOutput {
    /// A numeric result, validated for finiteness.
    Number(f64),
    /// Any other value, passed through as is.
    Value(Value),
}

/// Signature of a registered constructor.
pub type ConstructorFn = dyn Fn(&Value) -> Result<CastOutput, String> + Send + Sync;

/// A resolved caster.
#[derive(Clone)]
pub enum Caster {
    /// No coercion (external-mode fields and `Mixed`).
    Passthrough,
    /// Coerce scalars to strings.
    String,
    /// Coerce to a finite number.
    Number,
    /// Coerce to a boolean.
    Boolean,
    /// Wrap non-arrays in a one-element array.
    Array,
    /// Record identifier: non-empty string.
    ObjectId,
    /// A constructor registered under a type name.
    Custom {
        /// Registered name
        name: String,
        /// Constructor
        construct: Arc<ConstructorFn>,
    },
}

impl fmt::Debug for Caster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Caster {
    /// Type name this caster was resolved from.
    pub fn name(&self) -> &str {
        match self {
            Self::Passthrough => "Mixed",
            Self::String => "String",
            Self::Number => "Number",
            Self::Boolean => "Boolean",
            Self::Array => "Array",
            Self::ObjectId => "ObjectId",
            Self::Custom { name, .. } => name,
        }
    }

    /// Coerce one value.
    ///
    /// `null` passes through every caster; a missing reference is not a cast
    /// failure.
    pub fn cast(&self, value: &Value) -> Result<Value, DenormError> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        match self {
            Self::Passthrough => Ok(value.clone()),
            Self::String => match value {
                Value::String(_) => Ok(value.clone()),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                Value::Bool(b) => Ok(Value::String(b.to_string())),
                _ => Err(cast_error(value, "String")),
            },
            Self::Number => match value {
                Value::Number(_) => Ok(value.clone()),
                Value::Bool(b) => Ok(Value::from(u8::from(*b))),
                Value::String(s) => {
                    let trimmed = s.trim();
                    if trimmed.is_empty() {
                        return Err(cast_error(value, "NaN"));
                    }
                    finite_number(value, trimmed.parse::<f64>().unwrap_or(f64::NAN))
                }
                _ => Err(cast_error(value, "NaN")),
            },
            Self::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                Value::String(s) if s == "true" || s == "1" => Ok(Value::Bool(true)),
                Value::String(s) if s == "false" || s == "0" => Ok(Value::Bool(false)),
                Value::Number(n) if n.as_f64() == Some(1.0) => Ok(Value::Bool(true)),
                Value::Number(n) if n.as_f64() == Some(0.0) => Ok(Value::Bool(false)),
                _ => Err(cast_error(value, "Boolean")),
            },
            Self::Array => match value {
                Value::Array(_) => Ok(value.clone()),
                other => Ok(Value::Array(vec![other.clone()])),
            },
            Self::ObjectId => match value {
                Value::String(s) if !s.is_empty() => Ok(value.clone()),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                _ => Err(cast_error(value, "ObjectId")),
            },
            Self::Custom { name, construct } => {
                match construct(value).map_err(|reason| cast_error(value, &format!("{name} ({reason})")))? {
                    CastOutput::Number(n) => finite_number(value, n),
                    CastOutput::Value(v) => Ok(v),
                }
            }
        }
    }
}

fn cast_error(value: &Value, reason: &str) -> DenormError {
    let rendered = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    DenormError::Cast {
        value: rendered,
        reason: reason.to_string(),
    }
}

fn finite_number(input: &Value, n: f64) -> Result<Value, DenormError> {
    if n.is_nan() {
        return Err(cast_error(input, "NaN"));
    }
    Number::from_f64(n).map(Value::Number).ok_or_else(|| cast_error(input, "Infinite"))
}

/// Type names available to the `of` option.
#[derive(Clone, Default)]
pub struct CasterRegistry {
    custom: HashMap<String, Arc<ConstructorFn>>,
}

impl fmt::Debug for CasterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.custom.keys().collect();
        names.sort();
        f.debug_struct("CasterRegistry").field("custom", &names).finish()
    }
}

impl CasterRegistry {
    /// Registry with only the primitive names.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under `name`. Replaces a previous registration.
    pub fn register<F>(&mut self, name: impl Into<String>, construct: F) -> &mut Self
    where
        F: Fn(&Value) -> Result<CastOutput, String> + Send + Sync + 'static,
    {
        self.custom.insert(name.into(), Arc::new(construct));
        self
    }

    /// Resolve the `of` type name declared on field `key`.
    pub fn resolve(&self, key: &str, name: &str) -> Result<Caster, DenormError> {
        let caster = match name {
            "String" => Caster::String,
            "Number" => Caster::Number,
            "Boolean" => Caster::Boolean,
            "Array" => Caster::Array,
            "Mixed" => Caster::Passthrough,
            "ObjectId" => Caster::ObjectId,
            other => match self.custom.get(other) {
                Some(construct) => Caster::Custom {
                    name: other.to_string(),
                    construct: Arc::clone(construct),
                },
                None => {
                    return Err(DenormError::UnknownCaster {
                        key: key.to_string(),
                        name: other.to_string(),
                    });
                }
            },
        };
        Ok(caster)
    }
}
