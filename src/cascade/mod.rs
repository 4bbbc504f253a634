//! Propagation of changes to denormalized copies.
//!
//! [`CascadeEngine`] is invoked for every save and, when configured, every
//! remove of a record. It recomputes the record's own denormalized fields and
//! then re-saves each record that copies data from it, recursively, within one
//! [`PropagationSession`].
//!
//! # Example
//!
//! ```rust
//! use denorm_cascade::cascade::CascadeEngine;
//! use denorm_cascade::core::Record;
//! use denorm_cascade::field::FieldOptions;
//! use denorm_cascade::registry::{CollectionSchema, FieldType, Registry};
//! use denorm_cascade::store::memory::MemoryStore;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut registry = Registry::new();
//! registry.declare(
//!     CollectionSchema::new("Book")
//!         .field("author", FieldType::reference("Author"))
//!         .denormalize("authorSnapshot", FieldOptions::external("author").paths(json!(["name"]))),
//! )?;
//! let engine = CascadeEngine::new(Arc::new(registry), Arc::new(MemoryStore::new()));
//!
//! let mut author = Record::new("Author", "a1").with("name", "Ada");
//! engine.save(&mut author).await?;
//! let mut book = Record::new("Book", "b1").with("author", "a1");
//! engine.save(&mut book).await?;
//!
//! author.set("name", "Ada L.");
//! engine.save(&mut author).await?;
//!
//! let book = engine.store().get("Book", "b1").unwrap();
//! assert_eq!(book.get("authorSnapshot"), Some(&json!({"name": "Ada L."})));
//! # Ok(())
//! # }
//! ```

mod engine;
mod recompute;
pub mod session;

pub use engine::CascadeEngine;
pub use session::{CascadeReport, PropagationSession, Trigger};
