//! denorm-cascade - denormalized field propagation for document stores
//!
//! Records in a document store often keep copies of data owned by other
//! records: a book stores its author's name next to the author reference so it
//! can be read without a join. This crate keeps such copies consistent. When a
//! record is saved, every record that copies data from it is recomputed and
//! re-saved, transitively, exactly as far as the change reaches.
//!
//! # Architecture Overview
//!
//! - Collections are declared once into a [`registry::Registry`]. Each
//!   denormalized field names the relation it copies through and the paths it
//!   copies; declaration validates the field and records a
//!   `source → dependent` edge in the [`registry::DependencyGraph`].
//! - Saving a record through the [`cascade::CascadeEngine`] recomputes its own
//!   denormalized fields, persists it, and re-saves the records that depend on
//!   it inside one [`cascade::PropagationSession`].
//! - Persistence is delegated to a [`store::DocumentStore`].
//!
//! ## Key Features
//!
//! - **Path projection**: `["name", "address.city:town"]` style path
//!   specifications compiled into ordered copy instructions
//! - **Cardinalities**: single references, sequences and keyed collections
//! - **Internal fields**: fields that store their own references, cast with
//!   a named caster
//! - **Cycle-safe**: cyclic declarations terminate through a per-session
//!   visited-edge set
//!
//! # Core Modules
//!
//! - [`cascade`] - Cascade engine, propagation sessions and reports
//! - [`config`] - Engine configuration loaded from TOML
//! - [`core`] - Records, identifiers and the error taxonomy
//! - [`field`] - Field options, validated specifications and casters
//! - [`paths`] - Path specification compiler and dotted-path access
//! - [`registry`] - Declared collections and the dependency graph
//! - [`store`] - The document store collaborator and an in-memory store
//!
//! # Declaration Format
//!
//! Collections can be declared in TOML:
//!
//! ```toml
//! name = "Book"
//!
//! [fields]
//! author = { ref = "Author" }
//!
//! [denormalize.authorSnapshot]
//! from = "author"
//! paths = ["name"]
//! ```

// Propagation
pub mod cascade;
pub mod config;
pub mod constants;
pub mod core;

// Declarations
pub mod field;
pub mod paths;
pub mod registry;

// Persistence
pub mod store;

// test_utils module is available for both unit tests and integration tests
#[cfg(feature = "test-utils")]
pub mod test_utils;
