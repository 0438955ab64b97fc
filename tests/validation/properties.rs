//! Property-based tests for references, settings and logic.
//!
//! Uses proptest for random inputs with automatic shrinking. Async code runs
//! inside `tokio_test::block_on`.

use proptest::prelude::*;
use serde_json::{Map, Value, json};
use std::time::Duration;

use schema_pipeline::{
    Context, LogicSchema, NumberSchema, Reference, Schema, SchemaType, Setting, Settings,
};

/// Flat objects with short keys and integer values.
fn object_strategy() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-z]{1,6}", any::<i64>(), 1..8).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(key, value)| (key, json!(value)))
            .collect()
    })
}

/// Inputs for number checks: absent values, integers, numeric strings and text.
fn input_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<i32>().prop_map(|n| json!(n)),
        any::<i32>().prop_map(|n| json!(n.to_string())),
        "[a-z]{0,5}".prop_map(Value::String),
    ]
}

fn delayed(value: i64, millis: u64) -> Reference {
    Reference::function(move || {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Ok(json!(value))
        })
    })
}

proptest! {
    #[test]
    fn test_reference_resolution_is_idempotent(object in object_strategy()) {
        tokio_test::block_on(async {
            let data = Value::Object(object.clone());
            for key in object.keys() {
                let reference = Reference::new().path(key.as_str());
                let first = reference.resolve_in(&data).await.unwrap();
                let second = reference.resolve_in(&data).await.unwrap();
                assert_eq!(first.as_ref(), object.get(key));
                assert_eq!(first, second);
            }
        });
    }

    #[test]
    fn test_list_settings_keep_positions(
        items in prop::collection::vec((any::<i64>(), 0u64..15), 1..6)
    ) {
        tokio_test::block_on(async {
            let list: Vec<Setting> = items
                .iter()
                .map(|(value, millis)| delayed(*value, *millis).into())
                .collect();
            let mut settings = Settings::new();
            settings.set("list", Setting::List(list));
            let ctx = Context::detached(Value::Null);
            let resolved = settings.resolve(&ctx).await.unwrap();
            let expected: Vec<Value> = items.iter().map(|(value, _)| json!(value)).collect();
            assert_eq!(resolved.get("list").unwrap().items(), expected);
        });
    }

    #[test]
    fn test_allow_is_identity(input in input_strategy(), min in -100i32..100) {
        tokio_test::block_on(async {
            let inner = NumberSchema::new().min(min).unwrap();
            let logic = LogicSchema::new().allow(inner.clone()).unwrap();
            let direct = inner.validate(input.clone()).await;
            let through = logic.validate(input).await;
            match (direct, through) {
                (Ok(a), Ok(b)) => assert_eq!(a, b),
                (Err(_), Err(_)) => {}
                (a, b) => panic!("outcomes differ: {:?} vs {:?}", a, b),
            }
        });
    }

    #[test]
    fn test_allow_is_identity_for_base_settings(
        input in input_strategy(),
        default in prop::option::of(any::<i32>()),
        required in any::<bool>()
    ) {
        tokio_test::block_on(async {
            let mut inner = Schema::any();
            if let Some(default) = default {
                inner = inner.default_value(default);
            }
            if required {
                inner = inner.required(true).unwrap();
            }
            let logic = LogicSchema::new().allow(inner.clone()).unwrap();
            let direct = inner.validate(input.clone()).await;
            let through = logic.validate(input).await;
            match (direct, through) {
                (Ok(a), Ok(b)) => assert_eq!(a, b),
                (Err(a), Err(b)) => assert_eq!(a.message, b.message),
                (a, b) => panic!("outcomes differ: {:?} vs {:?}", a, b),
            }
        });
    }

    #[test]
    fn test_deny_inverts_outcome(input in input_strategy(), min in -100i32..100) {
        tokio_test::block_on(async {
            let inner = NumberSchema::new().min(min).unwrap();
            let logic = LogicSchema::new().deny(inner.clone()).unwrap();
            let direct = inner.validate(input.clone()).await;
            let through = logic.validate(input.clone()).await;
            assert_eq!(direct.is_ok(), through.is_err());
            if let Ok(value) = through {
                assert_eq!(value, input);
            }
        });
    }
}
