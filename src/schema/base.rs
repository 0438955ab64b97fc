//! Base stages shared by every schema type and the fluent setters for them.

use super::Schema;
use super::rules::{ALLOW, Flow, OPTIONAL, RAW, Rule};
use super::settings::{Resolved, ResolvedSettings, Setting, Settings};
use crate::config::ValidateOptions;
use crate::context::Context;
use crate::error::{ConfigError, ConfigResult, ValidationResult};
use futures::future::BoxFuture;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

pub const TITLE: &str = "title";
pub const DETAIL: &str = "detail";
pub const BASE: &str = "base";
pub const DEFAULT: &str = "default";
pub const REQUIRED: &str = "required";
pub const FORBIDDEN: &str = "forbidden";
pub const ALLOW_LIST: &str = "allow";
pub const DENY_LIST: &str = "deny";
pub const RAW_FLAG: &str = "raw";

pub(crate) fn optional_stage() -> Rule {
    Rule::new(OPTIONAL, describe_optional, validate_optional)
}

pub(crate) fn allow_stage() -> Rule {
    Rule::new(ALLOW, describe_allow, validate_allow)
}

pub(crate) fn raw_stage() -> Rule {
    Rule::new(RAW, describe_raw, validate_raw)
}

fn describe_optional(settings: &Settings) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(detail) = settings.get(DETAIL).and_then(Setting::as_value) {
        match detail {
            Value::String(text) => parts.push(text.clone()),
            other => parts.push(other.to_string()),
        }
    }
    if settings.flag(FORBIDDEN) {
        parts.push("No value is allowed here.".to_string());
    } else if let Some(default) = settings.get(DEFAULT) {
        parts.push(format!("It defaults to {} if not set.", default));
    } else if settings.flag(REQUIRED) {
        parts.push("A value is needed.".to_string());
    } else if let Some(required) = settings.get(REQUIRED).filter(|s| s.is_reference()) {
        parts.push(format!("A value is needed if {} is set.", required));
    } else {
        parts.push("It is optional.".to_string());
    }
    Some(parts.join(" "))
}

fn validate_optional<'a>(
    schema: &'a Schema,
    settings: &'a ResolvedSettings,
    ctx: &'a Arc<Context>,
) -> BoxFuture<'a, ValidationResult<Flow>> {
    Box::pin(async move {
        let value = ctx.value().await;
        if value.is_null() {
            if let Some(default) = settings.value(DEFAULT) {
                ctx.set_value(default).await;
                return Ok(Flow::Continue);
            }
            if settings.flag(REQUIRED) {
                return Err(schema.error_with(ctx, value, "A value is required"));
            }
            return Ok(Flow::Stop);
        }
        if settings.flag(FORBIDDEN) {
            return Err(schema.error_with(ctx, value, "No value is allowed here"));
        }
        Ok(Flow::Continue)
    })
}

fn describe_allow(settings: &Settings) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(allow) = settings.get(ALLOW_LIST) {
        parts.push(format!("Only the values {} are allowed.", allow));
    }
    if let Some(deny) = settings.get(DENY_LIST) {
        parts.push(format!("The values {} are not allowed.", deny));
    }
    (!parts.is_empty()).then(|| parts.join(" "))
}

fn validate_allow<'a>(
    schema: &'a Schema,
    settings: &'a ResolvedSettings,
    ctx: &'a Arc<Context>,
) -> BoxFuture<'a, ValidationResult<Flow>> {
    Box::pin(async move {
        let value = ctx.value().await;
        if let Some(deny) = settings.get(DENY_LIST).map(Resolved::items) {
            if deny.iter().any(|item| same_value(item, &value)) {
                return Err(schema.error_with(ctx, value, "Value is on the deny list"));
            }
        }
        if let Some(allow) = settings.get(ALLOW_LIST).map(Resolved::items) {
            if !allow.iter().any(|item| same_value(item, &value)) {
                return Err(schema.error_with(ctx, value, "Value is not one of the allowed values"));
            }
        }
        Ok(Flow::Continue)
    })
}

fn describe_raw(settings: &Settings) -> Option<String> {
    settings
        .flag(RAW_FLAG)
        .then(|| "The original value is returned once all checks passed.".to_string())
}

fn validate_raw<'a>(
    _schema: &'a Schema,
    settings: &'a ResolvedSettings,
    ctx: &'a Arc<Context>,
) -> BoxFuture<'a, ValidationResult<Flow>> {
    Box::pin(async move {
        if settings.flag(RAW_FLAG) {
            ctx.set_value(ctx.orig().clone()).await;
        }
        Ok(Flow::Continue)
    })
}

/// Equality where `5` and `5.0` are the same number.
pub(crate) fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Common interface of all schema types.
///
/// Implementors only expose their wrapped [`Schema`]; the fluent setters for
/// the base stages and the entry points come for free.
///
/// # Examples
///
/// ```rust
/// use schema_pipeline::{Schema, SchemaType};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let schema = Schema::any().default_value(json!(3)).title("Count");
/// assert_eq!(schema.validate(json!(null)).await.unwrap(), json!(3));
/// # });
/// ```
pub trait SchemaType: Sized {
    fn schema(&self) -> &Schema;

    fn schema_mut(&mut self) -> &mut Schema;

    fn into_schema(self) -> Schema;

    /// Short name used in error messages.
    fn title(mut self, title: impl Into<String>) -> Self {
        self.schema_mut().set(TITLE, title.into());
        self
    }

    /// Free text prepended to the description.
    fn detail(mut self, detail: impl Into<String>) -> Self {
        self.schema_mut().set(DETAIL, detail.into());
        self
    }

    /// Fail on absent values. Accepts a flag or a reference.
    fn required(mut self, required: impl Into<Setting>) -> ConfigResult<Self> {
        let required = required.into();
        if required.as_bool() == Some(true) && self.schema().settings().flag(FORBIDDEN) {
            return Err(ConfigError::conflict(REQUIRED, FORBIDDEN));
        }
        self.schema_mut().set(REQUIRED, required);
        Ok(self)
    }

    /// Fail on present values.
    fn forbidden(mut self, forbidden: bool) -> ConfigResult<Self> {
        let settings = self.schema().settings();
        if forbidden && settings.flag(REQUIRED) {
            return Err(ConfigError::conflict(FORBIDDEN, REQUIRED));
        }
        if forbidden && settings.contains(DEFAULT) {
            return Err(ConfigError::conflict(FORBIDDEN, DEFAULT));
        }
        self.schema_mut().set(FORBIDDEN, forbidden);
        Ok(self)
    }

    /// Value used when the input is absent.
    fn default_value(mut self, value: impl Into<Setting>) -> Self {
        self.schema_mut().set(DEFAULT, value.into());
        self
    }

    /// Restrict the value to one of `values`.
    fn allow_values<I, T>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Setting>,
    {
        self.schema_mut().set(ALLOW_LIST, Setting::set_of(values));
        self
    }

    /// Reject any of `values`.
    fn deny_values<I, T>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Setting>,
    {
        self.schema_mut().set(DENY_LIST, Setting::set_of(values));
        self
    }

    /// Return the original value instead of the transformed one.
    fn raw(mut self, raw: bool) -> Self {
        self.schema_mut().set(RAW_FLAG, raw);
        self
    }

    /// Validate this fixed value instead of the input.
    fn base(mut self, value: impl Into<Setting>) -> Self {
        self.schema_mut().set(BASE, value.into());
        self
    }

    fn describe(&self) -> String {
        self.schema().describe()
    }

    fn validate(&self, value: Value) -> impl Future<Output = ValidationResult<Value>> + Send {
        self.schema().validate(value)
    }

    fn validate_with(
        &self,
        value: Value,
        options: ValidateOptions,
    ) -> impl Future<Output = ValidationResult<Value>> + Send {
        self.schema().validate_with(value, options)
    }

    /// Run the pipeline on an existing context, see [`Schema::check`].
    fn check<'a>(&'a self, ctx: &'a Arc<Context>) -> BoxFuture<'a, ValidationResult<Value>> {
        self.schema().check(ctx)
    }
}

impl SchemaType for Schema {
    fn schema(&self) -> &Schema {
        self
    }

    fn schema_mut(&mut self) -> &mut Schema {
        self
    }

    fn into_schema(self) -> Schema {
        self
    }
}
