//! Collection graphs used across the test suites.
//!
//! Every registry here declares only what its scenario needs. Pair one with
//! [`memory_engine`] to get an engine over an empty [`MemoryStore`].

use serde_json::json;
use std::sync::Arc;

use crate::cascade::CascadeEngine;
use crate::field::FieldOptions;
use crate::registry::{CollectionSchema, FieldType, Registry};
use crate::store::memory::MemoryStore;

/// Engine with the default configuration over an empty in-memory store.
pub fn memory_engine(registry: Registry) -> CascadeEngine<MemoryStore> {
    CascadeEngine::new(Arc::new(registry), Arc::new(MemoryStore::new()))
}

/// `Author { name, born }` and `Book { author → Author, authorSnapshot }`
/// where the snapshot copies the author's name.
pub fn library_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .declare(
            CollectionSchema::new("Author")
                .field("name", FieldType::Scalar)
                .field("born", FieldType::Scalar),
        )
        .unwrap_or_else(|e| panic!("Author declaration: {e}"));
    registry
        .declare(
            CollectionSchema::new("Book")
                .field("title", FieldType::Scalar)
                .field("author", FieldType::reference("Author"))
                .denormalize(
                    "authorSnapshot",
                    FieldOptions::external("author").paths(json!(["name"])),
                ),
        )
        .unwrap_or_else(|e| panic!("Book declaration: {e}"));
    registry
}

/// Diamond `A → B`, `A → C`, `B → D`, `C → D`.
///
/// `B` and `C` copy `A.name` into `aData`; `D` copies `B.aData` into `bData`
/// and `C.aData` into `cData`.
pub fn diamond_registry() -> Registry {
    let mut registry = Registry::new();
    for middle in ["B", "C"] {
        registry
            .declare(
                CollectionSchema::new(middle)
                    .field("a", FieldType::reference("A"))
                    .denormalize("aData", FieldOptions::external("a").paths(json!(["name"]))),
            )
            .unwrap_or_else(|e| panic!("{middle} declaration: {e}"));
    }
    registry
        .declare(
            CollectionSchema::new("D")
                .field("b", FieldType::reference("B"))
                .field("c", FieldType::reference("C"))
                .denormalize("bData", FieldOptions::external("b").paths(json!(["aData"])))
                .denormalize("cData", FieldOptions::external("c").paths(json!(["aData"]))),
        )
        .unwrap_or_else(|e| panic!("D declaration: {e}"));
    registry
}

/// Cycle `A ⇄ B`: `A.bData` copies `B.name` and `B.aData` copies `A.name`.
pub fn cycle_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .declare(
            CollectionSchema::new("A")
                .field("b", FieldType::reference("B"))
                .denormalize("bData", FieldOptions::external("b").paths(json!(["name"]))),
        )
        .unwrap_or_else(|e| panic!("A declaration: {e}"));
    registry
        .declare(
            CollectionSchema::new("B")
                .field("a", FieldType::reference("A"))
                .denormalize("aData", FieldOptions::external("a").paths(json!(["name"]))),
        )
        .unwrap_or_else(|e| panic!("B declaration: {e}"));
    registry
}
