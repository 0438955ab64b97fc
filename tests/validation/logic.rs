//! Logic combinators inside composed schemas.

use serde_json::json;

use super::*;

use schema_pipeline::{
    LogicSchema, NumberSchema, ObjectSchema, Operator, Reference, Schema, SchemaType, StringSchema,
};

#[tokio::test]
async fn test_digits_with_separators() {
    init_logging();
    assert_validation_success!(digits_logic().validate(json!("5_5")).await, json!(55));
    assert_validation_success!(digits_logic().validate(json!("1_000")).await, json!(1000));
    assert_validation_error!(digits_logic().validate(json!("5-5")).await);
}

#[tokio::test]
async fn test_allow_matches_inner_schema() {
    let inner = NumberSchema::new().min(3).unwrap();
    let logic = LogicSchema::new().allow(inner.clone()).unwrap();
    for value in [json!(1), json!("4"), json!(10), json!("x")] {
        let direct = inner.validate(value.clone()).await;
        let through = logic.validate(value).await;
        match (direct, through) {
            (Ok(a), Ok(b)) => assert_eq!(a, b),
            (Err(_), Err(_)) => {}
            (a, b) => panic!("outcomes differ: {:?} vs {:?}", a, b),
        }
    }
}

#[tokio::test]
async fn test_deny_keeps_value_untouched() {
    let logic = LogicSchema::new()
        .deny(StringSchema::new().uppercase(true).allow_values(vec!["ROOT"]))
        .unwrap();
    assert_validation_success!(logic.validate(json!("admin")).await, json!("admin"));
    let error = assert_validation_error!(logic.validate(json!("root")).await);
    assert_eq!(error.message, "denied by logic");
    assert_eq!(error.value, json!("root"));
}

#[tokio::test]
async fn test_conditional_in_object() {
    let port = LogicSchema::new()
        .when(Schema::any().allow_values(vec![json!("default")]))
        .unwrap()
        .then(Schema::any().base(Reference::new().path("../fallback")))
        .unwrap()
        .otherwise(NumberSchema::new().integer(true))
        .unwrap();
    let schema = ObjectSchema::new()
        .key("port", port)
        .key("fallback", NumberSchema::new());

    assert_validation_success!(
        schema.validate(json!({"port": "default", "fallback": 80})).await,
        json!({"port": 80, "fallback": 80})
    );
    assert_validation_success!(
        schema.validate(json!({"port": "8080", "fallback": 80})).await,
        json!({"port": 8080, "fallback": 80})
    );
    let error = assert_validation_error!(
        schema.validate(json!({"port": 1.5, "fallback": 80})).await
    );
    assert_eq!(error.source, "/port");
}

#[tokio::test]
async fn test_mixed_chain() {
    // (short string) or (number and at most 10)
    let logic = LogicSchema::new()
        .allow(StringSchema::new().max_length(3).unwrap())
        .unwrap()
        .or(NumberSchema::new())
        .unwrap()
        .and(NumberSchema::new().max(10).unwrap())
        .unwrap();
    assert_validation_success!(logic.validate(json!("abc")).await, json!("abc"));
    assert_validation_success!(logic.validate(json!(7)).await, json!(7));
    assert_validation_error!(logic.validate(json!(11)).await);
    assert_validation_error!(logic.validate(json!("abcd")).await);
}

#[test]
fn test_entries_keep_chain_order() {
    let operators: Vec<Operator> = digits_logic()
        .entries()
        .into_iter()
        .map(|entry| entry.operator)
        .collect();
    assert_eq!(operators, vec![Operator::Allow, Operator::And]);
}

#[test]
fn test_invalid_chain_is_rejected() {
    assert!(LogicSchema::new().and(Schema::any()).is_err());
    assert!(LogicSchema::new().then(Schema::any()).is_err());
    assert!(
        LogicSchema::new()
            .when(Schema::any())
            .unwrap()
            .or(Schema::any())
            .is_err()
    );
}

#[test]
fn test_description_mentions_members() {
    let text = digits_logic().describe();
    assert!(text.contains("A numeric value is needed."), "{}", text);
}
