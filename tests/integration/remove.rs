use denorm_cascade::cascade::{CascadeEngine, Trigger};
use denorm_cascade::config::CascadeConfig;
use denorm_cascade::core::{DenormError, Record, find_denorm_error};
use denorm_cascade::field::FieldOptions;
use denorm_cascade::registry::{CollectionSchema, FieldType, Registry};
use denorm_cascade::store::memory::MemoryStore;
use serde_json::{Value, json};
use std::sync::Arc;

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .declare(
            CollectionSchema::new("Book")
                .field("author", FieldType::reference("Author"))
                .field("reviewers", FieldType::array_of(FieldType::reference("Author")))
                .denormalize("authorSnapshot", FieldOptions::external("author").paths(json!(["name"])))
                .denormalize("reviewersData", FieldOptions::external("reviewers").paths(json!(["name"]))),
        )
        .unwrap();
    registry
}

async fn engine(config: CascadeConfig) -> CascadeEngine<MemoryStore> {
    let engine = CascadeEngine::with_config(Arc::new(registry()), Arc::new(MemoryStore::new()), config).unwrap();
    engine.store().insert(&Record::new("Author", "ada").with("name", "Ada"));
    engine.store().insert(&Record::new("Author", "grace").with("name", "Grace"));
    let mut book = Record::new("Book", "b1")
        .with("author", "ada")
        .with("reviewers", json!(["ada", "grace"]));
    engine.save(&mut book).await.unwrap();
    engine
}

#[tokio::test]
async fn test_remove_nulls_single_relation() {
    let engine = engine(CascadeConfig::default()).await;
    let ada = engine.store().get("Author", "ada").unwrap();

    let report = engine.remove(&ada).await.unwrap();

    assert_eq!(report.trigger, Trigger::Remove);
    assert!(report.cascaded("Author:ada", "Book:b1"));
    assert!(engine.store().get("Author", "ada").is_none());

    let book = engine.store().get("Book", "b1").unwrap();
    assert_eq!(book.get("authorSnapshot"), Some(&Value::Null));
    assert_eq!(book.get("reviewersData"), Some(&json!([{"name": "Grace"}])));
}

#[tokio::test]
async fn test_remove_drops_sequence_entry_only() {
    let engine = engine(CascadeConfig::default()).await;
    let grace = engine.store().get("Author", "grace").unwrap();

    let report = engine.remove(&grace).await.unwrap();

    assert_eq!(report.recompute_count("Book:b1", "reviewersData"), 1);
    assert_eq!(report.recompute_count("Book:b1", "authorSnapshot"), 0);
    let book = engine.store().get("Book", "b1").unwrap();
    assert_eq!(book.get("reviewersData"), Some(&json!([{"name": "Ada"}])));
    assert_eq!(book.get("authorSnapshot"), Some(&json!({"name": "Ada"})));
}

#[tokio::test]
async fn test_remove_without_cascade() {
    let engine = engine(CascadeConfig::default().with_use_on_remove(false)).await;
    let ada = engine.store().get("Author", "ada").unwrap();

    let report = engine.remove(&ada).await.unwrap();

    assert!(report.edges.is_empty());
    assert!(engine.store().get("Author", "ada").is_none());
    let mut book = engine.store().get("Book", "b1").unwrap();
    assert_eq!(book.get("authorSnapshot"), Some(&json!({"name": "Ada"})));

    // The dangling reference surfaces on the next recompute
    book.set("author", "grace");
    book.set("author", "ada");
    let error = engine.save(&mut book).await.unwrap_err();
    assert!(matches!(
        find_denorm_error(&error),
        Some(DenormError::RelatedNotFound { collection, id, .. }) if collection == "Author" && id == "ada"
    ));
}
