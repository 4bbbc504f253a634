//! Properties of the path specification compiler.

use denorm_cascade::core::DenormError;
use denorm_cascade::paths::{PathMapping, compile_paths};
use serde_json::{Value, json};

fn specs() -> Vec<Value> {
    vec![
        json!(["name"]),
        json!(["a.b.c", "a", "x.y", "z"]),
        json!({"address": {"city": "town", "zip": true}, "name": 1, "tags": ["first", "last:final"]}),
        json!(["deep.er.path:alias", {"profile": {"avatar": {"url": true}}}, "top"]),
        json!({}),
        json!([]),
    ]
}

#[test]
fn test_compilation_is_deterministic() {
    for spec in specs() {
        let first = compile_paths(Some(&spec)).unwrap();
        let second = compile_paths(Some(&spec)).unwrap();
        assert_eq!(first, second, "spec {spec} compiled differently");
    }
}

#[test]
fn test_mappings_ordered_by_depth() {
    for spec in specs() {
        let compiled = compile_paths(Some(&spec)).unwrap();
        for pair in compiled.windows(2) {
            assert!(
                pair[0].depth() <= pair[1].depth(),
                "{} listed before shallower {} in {spec}",
                pair[0],
                pair[1]
            );
        }
    }
}

#[test]
fn test_equal_depth_keeps_declaration_order() {
    let compiled = compile_paths(Some(&json!(["b", "a.x", "c", "a"]))).unwrap();
    let gets: Vec<_> = compiled.iter().map(|m| m.get.as_str()).collect();
    assert_eq!(gets, vec!["b", "c", "a", "a.x"]);
}

#[test]
fn test_shorthand_rename_replaces_last_segment() {
    let compiled = compile_paths(Some(&json!(["a.b.c:x"]))).unwrap();
    assert_eq!(compiled, vec![PathMapping::new("a.b.c", "a.b.x")]);
}

#[test]
fn test_nested_object_prefixes_keys() {
    let compiled = compile_paths(Some(&json!({"address": {"city": "town"}}))).unwrap();
    assert_eq!(compiled, vec![PathMapping::new("address.city", "address.town")]);
}

#[test]
fn test_missing_spec_is_empty() {
    assert!(compile_paths(None).unwrap().is_empty());
}

#[test]
fn test_malformed_specs_are_rejected() {
    let malformed = vec![
        json!("name"),
        json!(42),
        json!([null]),
        json!([7]),
        json!({"name": null}),
        json!(["a:b:c"]),
        json!([":b"]),
        json!(["a:"]),
        json!(["a..b"]),
        json!([""]),
    ];

    for spec in malformed {
        let error = compile_paths(Some(&spec)).unwrap_err();
        assert!(
            matches!(error, DenormError::InvalidPaths { .. }),
            "{spec} produced {error:?}"
        );
    }
}
