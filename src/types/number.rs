//! Numeric values.

use crate::context::Context;
use crate::error::{ConfigError, ConfigResult, ValidationResult};
use crate::schema::{Flow, ResolvedSettings, Rule, Schema, SchemaType, Setting, Settings};
use futures::future::BoxFuture;
use serde_json::{Number, Value};
use std::sync::Arc;

pub const INTEGER: &str = "integer";
pub const MIN: &str = "min";
pub const MAX: &str = "max";

/// Schema for numbers.
///
/// Numeric strings are parsed. Whole numbers are returned as integers, so
/// `"55"` and `55.0` both become `55`.
#[derive(Debug, Clone)]
pub struct NumberSchema {
    schema: Schema,
}

impl NumberSchema {
    pub fn new() -> Self {
        Self {
            schema: Schema::with_stages(
                "number",
                [
                    Rule::new("number", describe_type, validate_type),
                    Rule::new("range", describe_range, validate_range),
                ],
            ),
        }
    }

    /// Only accept whole numbers.
    pub fn integer(mut self, integer: bool) -> Self {
        self.schema.set(INTEGER, integer);
        self
    }

    /// Lower bound, a number or a reference.
    pub fn min(mut self, min: impl Into<Setting>) -> ConfigResult<Self> {
        let min = min.into();
        check_range(min.as_f64(), self.schema.settings().number(MAX))?;
        self.schema.set(MIN, min);
        Ok(self)
    }

    /// Upper bound, a number or a reference.
    pub fn max(mut self, max: impl Into<Setting>) -> ConfigResult<Self> {
        let max = max.into();
        check_range(self.schema.settings().number(MIN), max.as_f64())?;
        self.schema.set(MAX, max);
        Ok(self)
    }
}

fn check_range(min: Option<f64>, max: Option<f64>) -> ConfigResult<()> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => Err(ConfigError::Range {
            min_name: MIN.to_string(),
            min,
            max_name: MAX.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

impl Default for NumberSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaType for NumberSchema {
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

/// Integers for whole values, floats otherwise.
fn normalize(n: f64) -> Option<Value> {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Some(Value::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number)
    }
}

fn describe_type(settings: &Settings) -> Option<String> {
    if settings.flag(INTEGER) {
        Some("An integer is needed.".to_string())
    } else {
        Some("A numeric value is needed.".to_string())
    }
}

fn validate_type<'a>(
    schema: &'a Schema,
    settings: &'a ResolvedSettings,
    ctx: &'a Arc<Context>,
) -> BoxFuture<'a, ValidationResult<Flow>> {
    Box::pin(async move {
        let value = ctx.value().await;
        let parsed = match &value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        };
        let Some(n) = parsed else {
            return Err(schema.error_with(ctx, value, "A numeric value is needed"));
        };
        if settings.flag(INTEGER) && n.fract() != 0.0 {
            return Err(schema.error_with(ctx, value, "An integer is needed"));
        }
        match normalize(n) {
            Some(number) => {
                ctx.set_value(number).await;
                Ok(Flow::Continue)
            }
            None => Err(schema.error_with(ctx, value, "A numeric value is needed")),
        }
    })
}

fn describe_range(settings: &Settings) -> Option<String> {
    match (settings.get(MIN), settings.get(MAX)) {
        (Some(min), Some(max)) => Some(format!("The value has to be between {} and {}.", min, max)),
        (Some(min), None) => Some(format!("The value has to be at least {}.", min)),
        (None, Some(max)) => Some(format!("The value has to be at most {}.", max)),
        (None, None) => None,
    }
}

fn validate_range<'a>(
    schema: &'a Schema,
    settings: &'a ResolvedSettings,
    ctx: &'a Arc<Context>,
) -> BoxFuture<'a, ValidationResult<Flow>> {
    Box::pin(async move {
        let value = ctx.value().await;
        let Some(n) = value.as_f64() else {
            return Ok(Flow::Continue);
        };
        if let Some(min) = settings.number(MIN) {
            if n < min {
                return Err(schema.error_with(ctx, value, format!("The value has to be at least {}", min)));
            }
        }
        if let Some(max) = settings.number(MAX) {
            if n > max {
                return Err(schema.error_with(ctx, value, format!("The value has to be at most {}", max)));
            }
        }
        Ok(Flow::Continue)
    })
}
