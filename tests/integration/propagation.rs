use denorm_cascade::core::Record;
use denorm_cascade::field::FieldOptions;
use denorm_cascade::registry::{CollectionSchema, FieldType, Registry};
use denorm_cascade::test_utils::{
    cycle_registry, diamond_registry, init_test_logging, library_registry, memory_engine,
};
use serde_json::json;

#[tokio::test]
async fn test_cycle_terminates() {
    init_test_logging(None);
    let engine = memory_engine(cycle_registry());
    engine.store().insert(&Record::new("A", "a1").with("name", "first").with("b", "b1"));
    engine.store().insert(&Record::new("B", "b1").with("name", "second").with("a", "a1"));

    let mut a = engine.store().get("A", "a1").unwrap();
    a.set("name", "first v2");
    let report = engine.save(&mut a).await.unwrap();

    assert!(report.cascaded("A:a1", "B:b1"));
    assert!(report.cascaded("B:b1", "A:a1"));
    assert_eq!(report.edges.len(), 2);
    assert_eq!(report.recompute_count("B:b1", "aData"), 1);
    assert_eq!(report.recompute_count("A:a1", "bData"), 1);
    assert_eq!(report.persist_count("B:b1"), 1);
    assert!(report.persist_count("A:a1") <= 2);

    let b = engine.store().get("B", "b1").unwrap();
    assert_eq!(b.get("aData"), Some(&json!({"name": "first v2"})));
    let a = engine.store().get("A", "a1").unwrap();
    assert_eq!(a.get("name"), Some(&json!("first v2")));
    assert_eq!(a.get("bData"), Some(&json!({"name": "second"})));
}

#[tokio::test]
async fn test_cycle_resave_reaches_caller_record() {
    let engine = memory_engine(cycle_registry());
    engine.store().insert(&Record::new("A", "a1").with("name", "first").with("b", "b1"));
    engine.store().insert(&Record::new("B", "b1").with("name", "second").with("a", "a1"));

    let mut a = engine.store().get("A", "a1").unwrap();
    a.set("name", "first v2");
    let report = engine.save(&mut a).await.unwrap();

    assert_eq!(report.persist_count("A:a1"), 2);
    assert_eq!(a.get("bData"), Some(&json!({"name": "second"})));
    assert!(!a.any_modified());

    // A later save through the same handle keeps the copy written by the cycle
    a.set("name", "first v3");
    engine.save(&mut a).await.unwrap();
    let stored = engine.store().get("A", "a1").unwrap();
    assert_eq!(stored.get("name"), Some(&json!("first v3")));
    assert_eq!(stored.get("bData"), Some(&json!({"name": "second"})));
}

#[tokio::test]
async fn test_self_reference_terminates() {
    let mut registry = Registry::new();
    registry
        .declare(
            CollectionSchema::new("Person")
                .field("mentor", FieldType::reference("Person"))
                .denormalize("mentorData", FieldOptions::external("mentor").paths(json!(["name"]))),
        )
        .unwrap();
    let engine = memory_engine(registry);
    engine.store().insert(&Record::new("Person", "p1").with("name", "One").with("mentor", "p2"));
    engine.store().insert(&Record::new("Person", "p2").with("name", "Two").with("mentor", "p1"));

    let mut one = engine.store().get("Person", "p1").unwrap();
    one.set("name", "One v2");
    let report = engine.save(&mut one).await.unwrap();

    assert_eq!(report.recompute_count("Person:p2", "mentorData"), 1);
    let two = engine.store().get("Person", "p2").unwrap();
    assert_eq!(two.get("mentorData"), Some(&json!({"name": "One v2"})));
}

#[tokio::test]
async fn test_diamond_sink_recomputed_once_per_field() {
    let engine = memory_engine(diamond_registry());
    engine.store().insert(&Record::new("A", "a1").with("name", "root"));
    engine.store().insert(&Record::new("B", "b1").with("a", "a1"));
    engine.store().insert(&Record::new("C", "c1").with("a", "a1"));
    engine.store().insert(&Record::new("D", "d1").with("b", "b1").with("c", "c1"));

    let mut a = engine.store().get("A", "a1").unwrap();
    a.set("name", "root v2");
    let report = engine.save(&mut a).await.unwrap();

    assert_eq!(report.recompute_count("D:d1", "bData"), 1);
    assert_eq!(report.recompute_count("D:d1", "cData"), 1);
    assert_eq!(report.recomputes_of("D:d1"), 2);
    assert_eq!(report.max_depth, 2);

    let d = engine.store().get("D", "d1").unwrap();
    assert_eq!(d.get("bData"), Some(&json!({"aData": {"name": "root v2"}})));
    assert_eq!(d.get("cData"), Some(&json!({"aData": {"name": "root v2"}})));
}

#[tokio::test]
async fn test_voluntary_save_skips_unmodified_relation() {
    let engine = memory_engine(library_registry());
    engine.store().insert(&Record::new("Author", "ada").with("name", "Ada"));
    engine.store().insert(
        &Record::new("Book", "b1")
            .with("author", "ada")
            .with("authorSnapshot", json!({"name": "Ada"})),
    );
    // Changed behind the engine's back
    engine.store().insert(&Record::new("Author", "ada").with("name", "Ada L."));

    let mut book = engine.store().get("Book", "b1").unwrap();
    book.set("title", "Notes");
    let report = engine.save(&mut book).await.unwrap();

    assert!(report.recomputed.is_empty());
    assert_eq!(book.get("authorSnapshot"), Some(&json!({"name": "Ada"})));

    // Reached through a cascade the same field is recomputed
    let mut author = engine.store().get("Author", "ada").unwrap();
    author.set("born", 1815);
    let report = engine.save(&mut author).await.unwrap();

    assert_eq!(report.recompute_count("Book:b1", "authorSnapshot"), 1);
    let book = engine.store().get("Book", "b1").unwrap();
    assert_eq!(book.get("authorSnapshot"), Some(&json!({"name": "Ada L."})));
    assert_eq!(book.get("title"), Some(&json!("Notes")));
}

#[tokio::test]
async fn test_enforcement_limited_to_reaching_relation() {
    let mut registry = Registry::new();
    registry
        .declare(
            CollectionSchema::new("Book")
                .field("author", FieldType::reference("Author"))
                .field("publisher", FieldType::reference("Publisher"))
                .denormalize("authorData", FieldOptions::external("author").paths(json!(["name"])))
                .denormalize("publisherData", FieldOptions::external("publisher").paths(json!(["name"]))),
        )
        .unwrap();
    let engine = memory_engine(registry);
    engine.store().insert(&Record::new("Author", "ada").with("name", "Ada"));
    engine.store().insert(&Record::new("Publisher", "p1").with("name", "Press"));
    engine.store().insert(&Record::new("Book", "b1").with("author", "ada").with("publisher", "p1"));

    let mut author = engine.store().get("Author", "ada").unwrap();
    author.set("name", "Ada L.");
    let report = engine.save(&mut author).await.unwrap();

    assert_eq!(report.recompute_count("Book:b1", "authorData"), 1);
    assert_eq!(report.recompute_count("Book:b1", "publisherData"), 0);
    let book = engine.store().get("Book", "b1").unwrap();
    assert!(book.get("publisherData").is_none());
}

#[tokio::test]
async fn test_undeclared_collection_saves_without_cascade() {
    let engine = memory_engine(library_registry());
    let mut shelf = Record::new("Shelf", "s1").with("label", "fiction");
    let report = engine.save(&mut shelf).await.unwrap();

    assert!(report.edges.is_empty());
    assert_eq!(engine.store().get("Shelf", "s1").unwrap().get("label"), Some(&json!("fiction")));
}
