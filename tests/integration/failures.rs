use denorm_cascade::cascade::CascadeEngine;
use denorm_cascade::core::Record;
use denorm_cascade::store::StoreError;
use denorm_cascade::store::memory::MemoryStore;
use denorm_cascade::test_utils::{library_registry, memory_engine};
use serde_json::json;

async fn seeded() -> CascadeEngine<MemoryStore> {
    let engine = memory_engine(library_registry());
    engine.save(&mut Record::new("Author", "ada").with("name", "Ada")).await.unwrap();
    for id in ["b1", "b2", "b3"] {
        engine.save(&mut Record::new("Book", id).with("author", "ada")).await.unwrap();
    }
    engine
}

#[tokio::test]
async fn test_persist_failure_mid_cascade() {
    let engine = seeded().await;
    engine.store().fail_persist("Book", "b2", "disk full");

    let mut author = engine.store().get("Author", "ada").unwrap();
    author.set("name", "Ada L.");
    let error = engine.save(&mut author).await.unwrap_err();

    let message = format!("{error:#}");
    assert!(message.contains("Author:ada -> Book:b2"), "{message}");
    assert!(message.contains("disk full"), "{message}");
    assert!(error.chain().any(|cause| matches!(
        cause.downcast_ref::<StoreError>(),
        Some(StoreError::Rejected { .. })
    )));

    // No rollback: work done before the failure stays persisted
    let snapshot = |id: &str| engine.store().get("Book", id).unwrap().get("authorSnapshot").cloned();
    assert_eq!(engine.store().get("Author", "ada").unwrap().get("name"), Some(&json!("Ada L.")));
    assert_eq!(snapshot("b1"), Some(json!({"name": "Ada L."})));
    assert_eq!(snapshot("b2"), Some(json!({"name": "Ada"})));
    assert_eq!(snapshot("b3"), Some(json!({"name": "Ada"})));
}

#[tokio::test]
async fn test_query_failure_names_edge() {
    let engine = seeded().await;
    engine.store().fail_find("Book", "timeout");

    let mut author = engine.store().get("Author", "ada").unwrap();
    author.set("name", "Ada L.");
    let error = engine.save(&mut author).await.unwrap_err();

    let message = format!("{error:#}");
    assert!(message.contains("Failed to find Book records whose 'author' references Author:ada"), "{message}");
    assert!(message.contains("timeout"), "{message}");
}

#[tokio::test]
async fn test_retry_after_failure_completes() {
    let engine = seeded().await;
    engine.store().fail_persist("Book", "b1", "locked");

    let mut author = engine.store().get("Author", "ada").unwrap();
    author.set("name", "Ada L.");
    assert!(engine.save(&mut author).await.is_err());

    engine.store().clear_failures();
    let mut author = engine.store().get("Author", "ada").unwrap();
    author.set("name", "Ada Lovelace");
    engine.save(&mut author).await.unwrap();

    for id in ["b1", "b2", "b3"] {
        let book = engine.store().get("Book", id).unwrap();
        assert_eq!(book.get("authorSnapshot"), Some(&json!({"name": "Ada Lovelace"})));
    }
}
