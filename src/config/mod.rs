//! Cascade engine configuration.
//!
//! The only behavioral switch is [`CascadeConfig::use_on_remove`]: whether
//! removing a record re-evaluates the records that denormalize from it. The
//! remaining fields tune the concurrency bounds and default to the values in
//! [`crate::constants`].
//!
//! ```toml
//! # cascade.toml
//! use_on_remove = false
//! field_concurrency = 2
//! binding_concurrency = 2
//! ```
//!
//! ```rust
//! use denorm_cascade::config::CascadeConfig;
//!
//! let config = CascadeConfig::from_toml_str("use_on_remove = false").unwrap();
//! assert!(!config.use_on_remove);
//! assert_eq!(config.field_concurrency, 2);
//! ```

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{DEFAULT_BINDING_CONCURRENCY, DEFAULT_FIELD_CONCURRENCY};

/// Settings of a [`CascadeEngine`](crate::cascade::CascadeEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CascadeConfig {
    /// Cascade to dependents when a record is removed.
    pub use_on_remove: bool,
    /// Denormalized fields of one record recomputed concurrently.
    pub field_concurrency: usize,
    /// Join bindings of one edge queried concurrently.
    pub binding_concurrency: usize,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            use_on_remove: true,
            field_concurrency: DEFAULT_FIELD_CONCURRENCY,
            binding_concurrency: DEFAULT_BINDING_CONCURRENCY,
        }
    }
}

impl CascadeConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    ///
    /// Read, parse and validation failures name the file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read cascade config: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse cascade config: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid cascade config: {}", path.display()))?;
        Ok(config)
    }

    /// Reject bounds that would stall the engine.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.field_concurrency > 0, "field_concurrency must be at least 1");
        ensure!(self.binding_concurrency > 0, "binding_concurrency must be at least 1");
        Ok(())
    }

    /// Builder form of [`CascadeConfig::use_on_remove`].
    #[must_use]
    pub fn with_use_on_remove(mut self, enabled: bool) -> Self {
        self.use_on_remove = enabled;
        self
    }
}
