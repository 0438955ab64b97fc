//! Objects with per-key schemas.
//!
//! Every declared key is validated in its own sub-context, in key order, and
//! the result is written back before the next key runs. A key can therefore
//! reference the already validated value of an earlier sibling. Keys ending up
//! `null` are removed.

use crate::context::Context;
use crate::error::ValidationResult;
use crate::schema::{Flow, ResolvedSettings, Rule, Schema, SchemaType, Setting, Settings};
use futures::future::BoxFuture;
use log::trace;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const KEYS: &str = "keys";
pub const DENY_UNKNOWN: &str = "deny_unknown";
pub const REMOVE_UNKNOWN: &str = "remove_unknown";

/// Scratch entry listing the keys no schema looked at.
pub const UNCHECKED: &str = "unchecked";

/// Schema for JSON objects.
#[derive(Debug, Clone)]
pub struct ObjectSchema {
    schema: Schema,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self {
            schema: Schema::with_stages(
                "object",
                [
                    Rule::new("object", |_| Some("An object is needed.".into()), validate_type),
                    Rule::new(KEYS, describe_keys, validate_keys),
                    Rule::new("unknown", describe_unknown, validate_unknown),
                ],
            ),
        }
    }

    /// Validate `name` with `schema`.
    pub fn key(mut self, name: impl Into<String>, schema: impl SchemaType) -> Self {
        let schema = Setting::Schema(Arc::new(schema.into_schema()));
        match self.schema.settings_mut().get_mut(KEYS) {
            Some(Setting::Map(keys)) => {
                keys.insert(name.into(), schema);
            }
            _ => {
                let mut keys = BTreeMap::new();
                keys.insert(name.into(), schema);
                self.schema.set(KEYS, Setting::Map(keys));
            }
        }
        self
    }

    /// Fail on keys without a schema.
    pub fn deny_unknown(mut self, deny: bool) -> Self {
        self.schema.set(DENY_UNKNOWN, deny);
        self
    }

    /// Drop keys without a schema.
    pub fn remove_unknown(mut self, remove: bool) -> Self {
        self.schema.set(REMOVE_UNKNOWN, remove);
        self
    }
}

impl Default for ObjectSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaType for ObjectSchema {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn schema_mut(&mut self) -> &mut Schema {
        &mut self.schema
    }

    fn into_schema(self) -> Schema {
        self.schema
    }
}

fn validate_type<'a>(
    schema: &'a Schema,
    _: &'a ResolvedSettings,
    ctx: &'a Arc<Context>,
) -> BoxFuture<'a, ValidationResult<Flow>> {
    Box::pin(async move {
        let value = ctx.value().await;
        if value.is_object() {
            Ok(Flow::Continue)
        } else {
            Err(schema.error_with(ctx, value, "An object is needed"))
        }
    })
}

fn describe_keys(settings: &Settings) -> Option<String> {
    let Some(Setting::Map(keys)) = settings.get(KEYS) else {
        return None;
    };
    let keys: Vec<String> = keys
        .iter()
        .map(|(key, schema)| match schema {
            Setting::Schema(schema) => format!("{}: {}", key, schema.describe()),
            other => format!("{}: {}", key, other),
        })
        .collect();
    Some(format!("Keys are checked as follows. {}", keys.join(" ")))
}

fn validate_keys<'a>(
    _: &'a Schema,
    settings: &'a ResolvedSettings,
    ctx: &'a Arc<Context>,
) -> BoxFuture<'a, ValidationResult<Flow>> {
    Box::pin(async move {
        let keys = settings.map(KEYS);
        if let Some(keys) = keys {
            for (key, schema) in keys.iter() {
                let Some(schema) = schema.as_schema() else {
                    continue;
                };
                let sub = ctx.sub(key).await;
                trace!("Checking key '{}' at '{}'", key, sub.source());
                let result = schema.check(&sub).await?;
                ctx.update(|value| {
                    if let Value::Object(map) = value {
                        if result.is_null() {
                            map.remove(key);
                        } else {
                            map.insert(key.clone(), result);
                        }
                    }
                })
                .await;
            }
        }
        let value = ctx.value().await;
        let unchecked: Vec<Value> = value
            .as_object()
            .map(|map| {
                map.keys()
                    .filter(|key| keys.is_none_or(|keys| !keys.contains_key(*key)))
                    .map(|key| Value::String(key.clone()))
                    .collect()
            })
            .unwrap_or_default();
        ctx.set_temp(UNCHECKED, Value::Array(unchecked)).await;
        Ok(Flow::Continue)
    })
}

fn describe_unknown(settings: &Settings) -> Option<String> {
    if settings.flag(REMOVE_UNKNOWN) {
        Some("Keys without a schema are removed.".to_string())
    } else if settings.flag(DENY_UNKNOWN) {
        Some("Keys without a schema are not allowed.".to_string())
    } else {
        None
    }
}

fn validate_unknown<'a>(
    schema: &'a Schema,
    settings: &'a ResolvedSettings,
    ctx: &'a Arc<Context>,
) -> BoxFuture<'a, ValidationResult<Flow>> {
    Box::pin(async move {
        let unchecked: Vec<String> = match ctx.temp(UNCHECKED).await {
            Some(Value::Array(keys)) => keys
                .into_iter()
                .filter_map(|key| key.as_str().map(String::from))
                .collect(),
            _ => Vec::new(),
        };
        if unchecked.is_empty() {
            return Ok(Flow::Continue);
        }
        if settings.flag(REMOVE_UNKNOWN) {
            ctx.update(|value| {
                if let Value::Object(map) = value {
                    for key in &unchecked {
                        map.remove(key);
                    }
                }
            })
            .await;
        } else if settings.flag(DENY_UNKNOWN) {
            let message = format!("Keys {} are not allowed", unchecked.join(", "));
            return Err(schema.error(ctx, message).await);
        }
        Ok(Flow::Continue)
    })
}
