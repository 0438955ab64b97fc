//! Reference resolution against literal trees and validated data.

use serde_json::{Value, json};

use super::*;

use schema_pipeline::{NumberSchema, ObjectSchema, Reference, SchemaType, data_ref};

fn sorted(value: Option<Value>) -> Vec<Value> {
    let mut items = match value {
        Some(Value::Array(items)) => items,
        Some(other) => vec![other],
        None => Vec::new(),
    };
    items.sort_by_key(|item| item.to_string());
    items
}

#[tokio::test]
async fn test_value_path() {
    let reference = Reference::value(json!({"a": {"b": 1}})).path("a/b");
    assert_eq!(reference.resolve_in(&Value::Null).await.unwrap(), Some(json!(1)));
}

#[tokio::test]
async fn test_deep_search_single_match() {
    init_logging();
    let reference = Reference::value(world()).path("**/munich/population");
    assert_eq!(
        reference.resolve_in(&Value::Null).await.unwrap(),
        Some(json!(1_500_000))
    );
}

#[tokio::test]
async fn test_deep_search_multiple_matches() {
    let reference = Reference::value(world()).path("europe/**/population");
    let found = sorted(reference.resolve_in(&Value::Null).await.unwrap());
    assert_eq!(found, vec![json!(1_500_000), json!(2_100_000), json!(3_600_000)]);
}

#[tokio::test]
async fn test_pattern_segment() {
    let reference = Reference::value(world()).path("europe/germany|france/*");
    let found = sorted(reference.resolve_in(&Value::Null).await.unwrap());
    // bavaria, berlin and idf
    assert_eq!(found.len(), 3);
}

#[tokio::test]
async fn test_no_match_is_undefined() {
    let reference = Reference::value(world()).path("**/nowhere");
    assert_eq!(reference.resolve_in(&Value::Null).await.unwrap(), None);
}

#[tokio::test]
async fn test_sibling_reference_in_object() {
    let schema = ObjectSchema::new()
        .key("a", NumberSchema::new())
        .key("b", NumberSchema::new());
    assert_validation_success!(
        schema.validate(json!({"a": data_ref("../b"), "b": 2})).await,
        json!({"a": 2, "b": 2})
    );
}

#[tokio::test]
async fn test_reference_into_nested_tree() {
    let data = set_path(
        json!({"cities": world()}),
        "pick",
        data_ref("../cities/asia/japan/kanto/tokyo/population"),
    );
    let schema =
        ObjectSchema::new().key("pick", NumberSchema::new().max(20_000_000).unwrap());
    let result = assert_validation_success!(schema.validate(data).await);
    assert_eq!(result["pick"], json!(14_000_000));
}

#[tokio::test]
async fn test_resolution_is_idempotent() {
    let tree = TreeBuilder::new()
        .city(&["south", "chile"], "santiago", 6_300_000)
        .build();
    let reference = Reference::value(tree).path("**/population");
    let first = reference.resolve_in(&Value::Null).await.unwrap();
    let second = reference.resolve_in(&Value::Null).await.unwrap();
    assert_eq!(first, Some(json!(6_300_000)));
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_fallback_when_missing() {
    let reference = Reference::new()
        .path("port")
        .or(Reference::value(json!(80)));
    assert_eq!(
        reference.resolve_in(&json!({"host": "x"})).await.unwrap(),
        Some(json!(80))
    );
    assert_eq!(
        reference.resolve_in(&json!({"port": 8080})).await.unwrap(),
        Some(json!(8080))
    );
}

#[tokio::test]
async fn test_parent_segment_leaves_nested_key() {
    // after stepping back out of `min`, the next `..` leaves `range` as well
    let schema = ObjectSchema::new().key(
        "range",
        ObjectSchema::new().key(
            "max",
            NumberSchema::new()
                .max(Reference::new().path("../min/../../ceiling"))
                .unwrap(),
        ),
    );
    let data = json!({"range": {"min": 1, "max": 9}, "ceiling": 5});
    let error = assert_validation_error!(schema.validate(data.clone()).await);
    assert_eq!(error.source, "/range/max");
    assert_eq!(error.message, "The value has to be at most 5");

    let data = set_path(data, "ceiling", json!(10));
    assert_validation_success!(schema.validate(data).await);
}
