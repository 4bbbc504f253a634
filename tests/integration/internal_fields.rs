use denorm_cascade::cascade::CascadeEngine;
use denorm_cascade::core::{Record, RelatedValue};
use denorm_cascade::field::{FieldOptions, RelationShape};
use denorm_cascade::registry::{CollectionSchema, FieldType, Registry};
use denorm_cascade::store::memory::MemoryStore;
use denorm_cascade::test_utils::{library_registry, memory_engine};
use serde_json::json;

fn post_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .declare(CollectionSchema::new("Tag").field("label", FieldType::Scalar))
        .unwrap();
    registry
        .declare(
            CollectionSchema::new("Post")
                .field("title", FieldType::Scalar)
                .denormalize("tags", FieldOptions::internal("ObjectId", "Tag").paths(json!(["label"])))
                .denormalize(
                    "featured",
                    FieldOptions::internal("ObjectId", "Tag")
                        .shape(RelationShape::KeyedCollection)
                        .to("featuredLabels")
                        .paths(json!({"label": "text"})),
                ),
        )
        .unwrap();
    registry
}

async fn seeded() -> CascadeEngine<MemoryStore> {
    let engine = memory_engine(post_registry());
    engine.store().insert(&Record::new("Tag", "t1").with("label", "rust"));
    engine.store().insert(&Record::new("Tag", "t2").with("label", "async"));
    engine
}

#[tokio::test]
async fn test_sequence_and_keyed_shapes() {
    let engine = seeded().await;
    let mut post = Record::new("Post", "p1")
        .with("tags", json!(["t1", "t2"]))
        .with("featured", json!({"main": "t2", "aside": "t1"}));
    engine.save(&mut post).await.unwrap();

    assert_eq!(post.get("tagsData"), Some(&json!([{"label": "rust"}, {"label": "async"}])));
    assert_eq!(
        post.get("featuredLabels"),
        Some(&json!({"main": {"text": "async"}, "aside": {"text": "rust"}}))
    );
}

#[tokio::test]
async fn test_tag_rename_cascades_to_both_fields() {
    let engine = seeded().await;
    let mut post = Record::new("Post", "p1")
        .with("tags", json!(["t1", "t2"]))
        .with("featured", json!({"main": "t2"}));
    engine.save(&mut post).await.unwrap();

    let mut tag = engine.store().get("Tag", "t2").unwrap();
    tag.set("label", "tokio");
    let report = engine.save(&mut tag).await.unwrap();

    assert_eq!(report.recompute_count("Post:p1", "tags"), 1);
    assert_eq!(report.recompute_count("Post:p1", "featured"), 1);
    assert_eq!(report.persist_count("Post:p1"), 1);

    let post = engine.store().get("Post", "p1").unwrap();
    assert_eq!(post.get("tagsData"), Some(&json!([{"label": "rust"}, {"label": "tokio"}])));
    assert_eq!(post.get("featuredLabels"), Some(&json!({"main": {"text": "tokio"}})));
}

#[tokio::test]
async fn test_populated_relation_used_and_not_persisted() {
    let engine = seeded().await;
    let mut post = Record::new("Post", "p1").with("tags", json!(["t1"]));
    post.populate("tags", RelatedValue::Sequence(vec![json!({"label": "preloaded"})]));

    engine.save(&mut post).await.unwrap();

    assert_eq!(post.get("tagsData"), Some(&json!([{"label": "preloaded"}])));
    let stored = engine.store().get("Post", "p1").unwrap();
    assert_eq!(stored.get("tags"), Some(&json!(["t1"])));
    assert!(!stored.is_populated("tags"));
}

#[tokio::test]
async fn test_repointed_relation_ignores_previous_population() {
    let engine = memory_engine(library_registry());
    engine.store().insert(&Record::new("Author", "ada").with("name", "Ada"));
    engine.store().insert(&Record::new("Author", "grace").with("name", "Grace"));

    let mut book = Record::new("Book", "b1").with("author", "ada");
    book.populate("author", RelatedValue::Single(Some(json!({"name": "Ada"}))));
    engine.save(&mut book).await.unwrap();
    assert_eq!(book.get("authorSnapshot"), Some(&json!({"name": "Ada"})));

    book.set("author", "grace");
    assert!(!book.is_populated("author"));
    let report = engine.save(&mut book).await.unwrap();

    assert_eq!(report.recompute_count("Book:b1", "authorSnapshot"), 1);
    assert_eq!(book.get("authorSnapshot"), Some(&json!({"name": "Grace"})));
    let stored = engine.store().get("Book", "b1").unwrap();
    assert_eq!(stored.get("author"), Some(&json!("grace")));
    assert_eq!(stored.get("authorSnapshot"), Some(&json!({"name": "Grace"})));
}

#[tokio::test]
async fn test_empty_sequence() {
    let engine = seeded().await;
    let mut post = Record::new("Post", "p1").with("tags", json!([]));
    engine.save(&mut post).await.unwrap();
    assert_eq!(post.get("tagsData"), Some(&json!([])));
}
