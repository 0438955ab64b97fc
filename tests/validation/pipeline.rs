//! Pipeline tests on composed schemas.
//!
//! These tests drive whole object schemas through validation, including data
//! references between keys and external resolvers.

use serde_json::{Value, json};

use super::*;

use futures::future::BoxFuture;
use schema_pipeline::{
    NumberSchema, ObjectSchema, Reference, ReferenceResult, Resolver, ResolverConfig, Resolvers, Schema,
    SchemaType, StringSchema, ValidateOptions,
};

struct CatalogResolver;

impl Resolver for CatalogResolver {
    fn scheme(&self) -> &str {
        "catalog"
    }

    fn resolve<'a>(&'a self, location: &'a str) -> BoxFuture<'a, ReferenceResult<Value>> {
        Box::pin(async move {
            Ok(match location {
                "default-port" => json!(443),
                _ => Value::Null,
            })
        })
    }
}

fn config_schema() -> ObjectSchema {
    ObjectSchema::new()
        .key("host", StringSchema::new().trim(true).required(true).unwrap())
        .key("port", NumberSchema::new().integer(true))
        .key("admin_port", NumberSchema::new().integer(true))
        .key(
            "limits",
            ObjectSchema::new()
                .key("min", NumberSchema::new())
                .key("max", NumberSchema::new().min(Reference::new().path("../min")).unwrap()),
        )
}

#[tokio::test]
async fn test_address_is_normalized() {
    init_logging();
    assert_validation_success!(
        address_schema().validate(address()).await,
        json!({"street": "Main Street 1", "zip": "80331", "country": "DE"})
    );
}

#[tokio::test]
async fn test_default_fills_absent_key() {
    let data = set_path(address(), "country", Value::Null);
    let result = assert_validation_success!(address_schema().validate(data).await);
    assert_eq!(result["country"], json!("DE"));
}

#[tokio::test]
async fn test_missing_required_key() {
    let mut data = address();
    data.as_object_mut().unwrap().remove("zip");
    let error = assert_validation_error!(address_schema().validate(data).await);
    assert_eq!(error.source, "/zip");
    assert_eq!(error.message, "A value is required");
}

#[tokio::test]
async fn test_allow_list_after_transformation() {
    let data = set_path(address(), "country", json!("it"));
    let error = assert_validation_error!(address_schema().validate(data).await);
    assert_eq!(error.source, "/country");
    assert_eq!(error.value, json!("IT"));
}

#[tokio::test]
async fn test_unknown_key_rejected() {
    let data = set_path(address(), "phone", json!("123"));
    assert_error_message_contains!(address_schema().validate(data).await, "phone");
}

#[tokio::test]
async fn test_error_text_explains_failure() {
    let schema = ObjectSchema::new().key(
        "zip",
        StringSchema::new()
            .title("Postal code")
            .pattern_str("^[0-9]{5}$")
            .unwrap(),
    );
    let error = assert_validation_error!(
        schema
            .validate_with(json!({"zip": "123"}), ValidateOptions::new().with_source("address.json"))
            .await
    );
    let text = error.text();
    assert!(text.starts_with("Postal code: It does not match"));
    assert!(text.contains("> Given value: \"123\" at address.json/zip"));
    assert!(text.contains("> Expected: It is optional. A text string is needed."));
}

#[tokio::test]
async fn test_data_references_between_keys() {
    let result = assert_validation_success!(config_schema().validate(server_config()).await);
    assert_eq!(
        result,
        json!({
            "host": "example.org",
            "port": 8080,
            "admin_port": 8080,
            "limits": {"min": 1, "max": 1}
        })
    );
}

#[tokio::test]
async fn test_reference_to_missing_key_is_absent() {
    let data = set_path(server_config(), "admin_port", json!({"$ref": "../nothing"}));
    let result = assert_validation_success!(config_schema().validate(data).await);
    assert!(result.get("admin_port").is_none());
}

#[tokio::test]
async fn test_custom_resolver() {
    let options = ValidateOptions::new()
        .with_resolvers(Resolvers::default().with(CatalogResolver))
        .with_external_data_refs(true);
    let data = set_path(
        server_config(),
        "admin_port",
        json!({"$ref": "catalog://default-port"}),
    );
    let result = assert_validation_success!(config_schema().validate_with(data, options).await);
    assert_eq!(result["admin_port"], json!(443));
    assert_eq!(result["port"], json!(8080));
}

#[tokio::test]
async fn test_environment_reference() {
    let expected = std::env::var("PATH").unwrap();
    let schema = Schema::any();
    let options = ValidateOptions::new().with_external_data_refs(true);
    assert_validation_success!(
        schema.validate_with(json!({"$ref": "env://PATH"}), options).await,
        Value::String(expected)
    );
}

#[tokio::test]
async fn test_external_references_in_data_need_opt_in() {
    let path = std::env::temp_dir().join(format!("schema-pipeline-data-{}.txt", std::process::id()));
    tokio::fs::write(&path, "secret").await.unwrap();
    let schema = ObjectSchema::new().key("name", StringSchema::new());

    for target in [format!("file://{}", path.display()), "env://PATH".to_string()] {
        let error = assert_validation_error!(
            schema.validate(json!({"name": {"$ref": target}})).await
        );
        assert_eq!(error.source, "/name");
        assert_eq!(error.message, "External references are not allowed in the data");
    }

    // absolute paths stay out of reach even with the opt-in
    let options = ValidateOptions::new().with_external_data_refs(true);
    let data = json!({"name": {"$ref": format!("file://{}", path.display())}});
    assert_error_message_contains!(schema.validate_with(data, options).await, "Invalid reference location");
    tokio::fs::remove_file(&path).await.unwrap();

    // in-process references are unaffected
    let schema = StringSchema::new().base(Reference::parse("env://PATH"));
    assert!(schema.validate(Value::Null).await.is_ok());
}

#[tokio::test]
async fn test_command_resolver_needs_opt_in() {
    let schema = NumberSchema::new();
    assert_error_message_contains!(
        schema
            .validate_with(
                json!({"$ref": "cmd://echo 5"}),
                ValidateOptions::new().with_external_data_refs(true)
            )
            .await,
        "disabled"
    );

    let config = ResolverConfig::from_json(r#"{"allowCommand": true}"#).unwrap();
    let options = ValidateOptions::new()
        .with_resolvers(Resolvers::from_config(&config))
        .with_external_data_refs(true);
    assert_validation_success!(
        schema.validate_with(json!({"$ref": "cmd://echo 5"}), options).await,
        json!(5)
    );
}

#[tokio::test]
async fn test_raw_keeps_input_after_checks() {
    let schema = ObjectSchema::new()
        .key("n", NumberSchema::new().raw(true))
        .key("m", NumberSchema::new());
    assert_validation_success!(
        schema.validate(json!({"n": "7", "m": "8"})).await,
        json!({"n": "7", "m": 8})
    );
}
