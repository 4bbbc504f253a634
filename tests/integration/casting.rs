use denorm_cascade::core::{DenormError, Record, find_denorm_error};
use denorm_cascade::field::FieldOptions;
use denorm_cascade::registry::{CollectionSchema, FieldType, Registry};
use denorm_cascade::test_utils::memory_engine;
use serde_json::json;

fn invoice_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .declare(
            CollectionSchema::new("Invoice")
                .field("customer", FieldType::reference("Customer"))
                .denormalize("customerData", FieldOptions::external("customer").paths(json!(["name"])))
                .denormalize("rates", FieldOptions::internal("Number", "Rate").paths(json!(["percent"]))),
        )
        .unwrap();
    registry
}

#[tokio::test]
async fn test_nan_cast_leaves_destination_untouched() {
    let engine = memory_engine(invoice_registry());
    engine.store().insert(&Record::new("Rate", "1").with("percent", 5));

    let mut invoice = Record::from_body(
        "Invoice",
        "i1",
        json!({"rates": [1], "ratesData": [{"percent": 5}]}),
    );
    invoice.set("rates", json!(["abc"]));

    let error = engine.save(&mut invoice).await.unwrap_err();
    assert!(matches!(
        find_denorm_error(&error),
        Some(DenormError::Cast { reason, .. }) if reason == "NaN"
    ));
    assert!(format!("{error:#}").contains("Invoice:i1"));

    assert_eq!(invoice.get("ratesData"), Some(&json!([{"percent": 5}])));
    assert!(!invoice.is_modified("ratesData"));
    assert!(engine.store().get("Invoice", "i1").is_none());
}

#[tokio::test]
async fn test_infinite_cast_rejected() {
    let engine = memory_engine(invoice_registry());
    let mut invoice = Record::new("Invoice", "i1").with("rates", json!(["1e400"]));

    let error = engine.save(&mut invoice).await.unwrap_err();
    assert!(matches!(
        find_denorm_error(&error),
        Some(DenormError::Cast { reason, .. }) if reason == "Infinite"
    ));
    assert!(invoice.get("ratesData").is_none());
}

#[tokio::test]
async fn test_failed_field_blocks_sibling_fields() {
    let engine = memory_engine(invoice_registry());
    engine.store().insert(&Record::new("Customer", "c1").with("name", "Acme"));

    let mut invoice = Record::new("Invoice", "i1").with("customer", "c1").with("rates", json!(["x"]));
    assert!(engine.save(&mut invoice).await.is_err());
    assert!(invoice.get("customerData").is_none());
}

#[tokio::test]
async fn test_valid_cast_written_back() {
    let engine = memory_engine(invoice_registry());
    engine.store().insert(&Record::new("Rate", "7").with("percent", 20));

    let mut invoice = Record::new("Invoice", "i1").with("rates", json!(["7"]));
    engine.save(&mut invoice).await.unwrap();

    assert_eq!(invoice.get("rates"), Some(&json!([7.0])));
    assert_eq!(invoice.get("ratesData"), Some(&json!([{"percent": 20}])));
}
