//! Text values.

use crate::context::Context;
use crate::error::{ConfigError, ConfigResult, ValidationResult};
use crate::schema::{Flow, Resolved, ResolvedSettings, Rule, Schema, SchemaType, Setting, Settings};
use futures::future::BoxFuture;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

pub const REPLACE: &str = "replace";
pub const TRIM: &str = "trim";
pub const LOWERCASE: &str = "lowercase";
pub const UPPERCASE: &str = "uppercase";
pub const MIN_LENGTH: &str = "min_length";
pub const MAX_LENGTH: &str = "max_length";
pub const PATTERN: &str = "pattern";

/// Schema for strings.
///
/// Transformations run before checks: replacements, trimming, case
/// conversion, then length and pattern checks.
#[derive(Debug, Clone)]
pub struct StringSchema {
    schema: Schema,
}

impl StringSchema {
    pub fn new() -> Self {
        Self {
            schema: Schema::with_stages(
                "string",
                [
                    Rule::new("string", |_| Some("A text string is needed.".into()), validate_type),
                    Rule::new(REPLACE, describe_replace, validate_replace),
                    Rule::new(TRIM, describe_trim, validate_trim),
                    Rule::new("case", describe_case, validate_case),
                    Rule::new("length", describe_length, validate_length),
                    Rule::new(PATTERN, describe_pattern, validate_pattern),
                ],
            ),
        }
    }

    /// Replace all matches of `pattern`. Replacements run in the order added.
    pub fn replace(mut self, pattern: Regex, replacement: impl Into<String>) -> Self {
        let pair = Setting::List(vec![
            Setting::Pattern(pattern),
            Setting::from(replacement.into()),
        ]);
        match self.schema.settings_mut().get_mut(REPLACE) {
            Some(Setting::List(pairs)) => pairs.push(pair),
            _ => self.schema.set(REPLACE, Setting::List(vec![pair])),
        }
        self
    }

    /// Remove whitespace at both ends.
    pub fn trim(mut self, trim: bool) -> Self {
        self.schema.set(TRIM, trim);
        self
    }

    pub fn lowercase(mut self, lowercase: bool) -> Self {
        self.schema.unset(UPPERCASE);
        self.schema.set(LOWERCASE, lowercase);
        self
    }

    pub fn uppercase(mut self, uppercase: bool) -> Self {
        self.schema.unset(LOWERCASE);
        self.schema.set(UPPERCASE, uppercase);
        self
    }

    /// Minimum number of characters, a number or a reference.
    pub fn min_length(mut self, min: impl Into<Setting>) -> ConfigResult<Self> {
        let min = min.into();
        check_range(min.as_f64(), self.schema.settings().number(MAX_LENGTH))?;
        self.schema.set(MIN_LENGTH, min);
        Ok(self)
    }

    /// Maximum number of characters, a number or a reference.
    pub fn max_length(mut self, max: impl Into<Setting>) -> ConfigResult<Self> {
        let max = max.into();
        check_range(self.schema.settings().number(MIN_LENGTH), max.as_f64())?;
        self.schema.set(MAX_LENGTH, max);
        Ok(self)
    }

    /// Exact number of characters.
    pub fn length(self, length: usize) -> ConfigResult<Self> {
        let mut schema = self;
        schema.schema.unset(MIN_LENGTH);
        schema.schema.unset(MAX_LENGTH);
        schema.min_length(length)?.max_length(length)
    }

    /// Require a match of `pattern`.
    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.schema.set(PATTERN, pattern);
        self
    }

    /// Like [`pattern`](Self::pattern), compiling the expression first.
    pub fn pattern_str(self, pattern: &str) -> ConfigResult<Self> {
        let regex = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(self.pattern(regex))
    }
}

fn check_range(min: Option<f64>, max: Option<f64>) -> ConfigResult<()> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => Err(ConfigError::Range {
            min_name: MIN_LENGTH.to_string(),
            min,
            max_name: MAX_LENGTH.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

impl Default for StringSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaType for StringSchema {
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

async fn update_text(ctx: &Context, f: impl FnOnce(&str) -> String) {
    ctx.update(|value| {
        if let Value::String(text) = value {
            *text = f(text);
        }
    })
    .await;
}

fn validate_type<'a>(
    schema: &'a Schema,
    _: &'a ResolvedSettings,
    ctx: &'a Arc<Context>,
) -> BoxFuture<'a, ValidationResult<Flow>> {
    Box::pin(async move {
        let value = ctx.value().await;
        if value.is_string() {
            Ok(Flow::Continue)
        } else {
            Err(schema.error_with(ctx, value, "A text string is needed"))
        }
    })
}

fn describe_replace(settings: &Settings) -> Option<String> {
    let Some(Setting::List(pairs)) = settings.get(REPLACE) else {
        return None;
    };
    let pairs: Vec<String> = pairs
        .iter()
        .filter_map(|pair| match pair {
            Setting::List(items) if items.len() == 2 => {
                Some(format!("{} with {}", items[0], items[1]))
            }
            _ => None,
        })
        .collect();
    Some(format!("Replacements: {}.", pairs.join(", ")))
}

fn validate_replace<'a>(
    _: &'a Schema,
    settings: &'a ResolvedSettings,
    ctx: &'a Arc<Context>,
) -> BoxFuture<'a, ValidationResult<Flow>> {
    Box::pin(async move {
        let Some(pairs) = settings.list(REPLACE) else {
            return Ok(Flow::Continue);
        };
        update_text(ctx, |text| {
            let mut text = text.to_string();
            for pair in pairs {
                if let Some([Resolved::Pattern(regex), replacement]) = pair.as_list() {
                    let replacement = replacement.as_str().unwrap_or_default();
                    text = regex.replace_all(&text, replacement).into_owned();
                }
            }
            text
        })
        .await;
        Ok(Flow::Continue)
    })
}

fn describe_trim(settings: &Settings) -> Option<String> {
    settings
        .flag(TRIM)
        .then(|| "Whitespace at both ends is removed.".to_string())
}

fn validate_trim<'a>(
    _: &'a Schema,
    settings: &'a ResolvedSettings,
    ctx: &'a Arc<Context>,
) -> BoxFuture<'a, ValidationResult<Flow>> {
    Box::pin(async move {
        if settings.flag(TRIM) {
            update_text(ctx, |text| text.trim().to_string()).await;
        }
        Ok(Flow::Continue)
    })
}

fn describe_case(settings: &Settings) -> Option<String> {
    if settings.flag(LOWERCASE) {
        Some("It is converted to lowercase.".to_string())
    } else if settings.flag(UPPERCASE) {
        Some("It is converted to uppercase.".to_string())
    } else {
        None
    }
}

fn validate_case<'a>(
    _: &'a Schema,
    settings: &'a ResolvedSettings,
    ctx: &'a Arc<Context>,
) -> BoxFuture<'a, ValidationResult<Flow>> {
    Box::pin(async move {
        if settings.flag(LOWERCASE) {
            update_text(ctx, str::to_lowercase).await;
        } else if settings.flag(UPPERCASE) {
            update_text(ctx, str::to_uppercase).await;
        }
        Ok(Flow::Continue)
    })
}

fn describe_length(settings: &Settings) -> Option<String> {
    match (settings.get(MIN_LENGTH), settings.get(MAX_LENGTH)) {
        (Some(min), Some(max)) => Some(format!("It needs between {} and {} characters.", min, max)),
        (Some(min), None) => Some(format!("It needs at least {} characters.", min)),
        (None, Some(max)) => Some(format!("It needs at most {} characters.", max)),
        (None, None) => None,
    }
}

fn validate_length<'a>(
    schema: &'a Schema,
    settings: &'a ResolvedSettings,
    ctx: &'a Arc<Context>,
) -> BoxFuture<'a, ValidationResult<Flow>> {
    Box::pin(async move {
        let value = ctx.value().await;
        let length = value.as_str().map(|s| s.chars().count()).unwrap_or(0) as f64;
        if let Some(min) = settings.number(MIN_LENGTH) {
            if length < min {
                let message = format!("At least {} characters are needed", min);
                return Err(schema.error_with(ctx, value, message));
            }
        }
        if let Some(max) = settings.number(MAX_LENGTH) {
            if length > max {
                let message = format!("At most {} characters are allowed", max);
                return Err(schema.error_with(ctx, value, message));
            }
        }
        Ok(Flow::Continue)
    })
}

fn describe_pattern(settings: &Settings) -> Option<String> {
    settings
        .get(PATTERN)
        .map(|pattern| format!("It has to match {}.", pattern))
}

fn validate_pattern<'a>(
    schema: &'a Schema,
    settings: &'a ResolvedSettings,
    ctx: &'a Arc<Context>,
) -> BoxFuture<'a, ValidationResult<Flow>> {
    Box::pin(async move {
        let Some(regex) = settings.pattern(PATTERN) else {
            return Ok(Flow::Continue);
        };
        let value = ctx.value().await;
        if value.as_str().is_some_and(|s| regex.is_match(s)) {
            Ok(Flow::Continue)
        } else {
            let message = format!("It does not match /{}/", regex.as_str());
            Err(schema.error_with(ctx, value, message))
        }
    })
}
