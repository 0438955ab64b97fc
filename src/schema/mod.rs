//! The rule pipeline shared by all schema types.
//!
//! A [`Schema`] owns a settings bag and an ordered list of rules. Validation
//! runs in fixed steps:
//!
//! 1. wrap the value in a root [`Context`] (or reuse a given one)
//! 2. substitute the `base` setting for the value if one is set
//! 3. resolve a `{"$ref": ...}` value
//! 4. resolve all settings concurrently
//! 5. run the rules in order until one fails or stops the pipeline
//! 6. settle the context with the final value
//!
//! # Examples
//!
//! ```rust
//! use schema_pipeline::{Schema, SchemaType};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let schema = Schema::any().allow_values(vec![json!("a"), json!("b")]);
//! assert!(schema.validate(json!("a")).await.is_ok());
//! assert!(schema.validate(json!("c")).await.is_err());
//! # });
//! ```

pub mod base;
pub mod rules;
pub mod settings;


pub use base::SchemaType;
pub use rules::{Flow, Rule, Rules};
pub use settings::{Resolved, ResolvedSettings, Setting, Settings};

use crate::config::ValidateOptions;
use crate::context::Context;
use crate::error::{ReferenceError, ValidationError, ValidationResult};
use crate::reference::Reference;
use futures::future::BoxFuture;
use log::{debug, trace};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A validation schema: settings plus the rules interpreting them.
#[derive(Clone)]
pub struct Schema {
    kind: &'static str,
    settings: Settings,
    rules: Rules,
}

impl Schema {
    /// A schema with only the base stages.
    pub fn new(kind: &'static str) -> Self {
        Self::with_stages(kind, Vec::new())
    }

    /// A schema with the given rules placed between the optional stage and the
    /// allow stage.
    pub fn with_stages(kind: &'static str, stages: impl IntoIterator<Item = Rule>) -> Self {
        let rules = std::iter::once(base::optional_stage())
            .chain(stages)
            .chain([base::allow_stage(), base::raw_stage()])
            .collect();
        Self {
            kind,
            settings: Settings::new(),
            rules,
        }
    }

    /// A schema with the given rules running ahead of the optional stage.
    ///
    /// These rules also see absent values.
    pub fn with_leading_stages(kind: &'static str, stages: impl IntoIterator<Item = Rule>) -> Self {
        let rules = stages
            .into_iter()
            .chain([base::optional_stage(), base::allow_stage(), base::raw_stage()])
            .collect();
        Self {
            kind,
            settings: Settings::new(),
            rules,
        }
    }

    /// A schema accepting any value.
    pub fn any() -> Self {
        Self::new("any")
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut Rules {
        &mut self.rules
    }

    /// Replace a setting.
    pub fn set(&mut self, name: &'static str, setting: impl Into<Setting>) {
        self.settings.set(name, setting);
    }

    /// Remove a setting.
    pub fn unset(&mut self, name: &str) {
        self.settings.remove(name);
    }

    /// The title setting, if it is a literal string.
    pub fn label(&self) -> Option<String> {
        self.settings
            .get(base::TITLE)
            .and_then(Setting::as_value)
            .and_then(Value::as_str)
            .map(String::from)
    }

    /// Human readable description built from the declared settings.
    pub fn describe(&self) -> String {
        self.rules
            .iter()
            .filter_map(|rule| (rule.describe)(&self.settings))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Validate a value with default options.
    pub async fn validate(&self, value: Value) -> ValidationResult<Value> {
        self.validate_with(value, ValidateOptions::default()).await
    }

    /// Validate a value with explicit options.
    pub async fn validate_with(
        &self,
        value: Value,
        options: ValidateOptions,
    ) -> ValidationResult<Value> {
        let ctx = Context::new(value, options);
        debug!("Validating {} schema at '{}'", self.kind, ctx.source());
        let result = self.check(&ctx).await;
        match &result {
            Ok(_) => debug!("Validation at '{}' succeeded", ctx.source()),
            Err(e) => debug!("Validation failed: {}", e),
        }
        result
    }

    /// Run the pipeline on an existing context.
    ///
    /// Used for nested values and by the logic combinators. The context is
    /// settled with the result.
    pub fn check<'a>(&'a self, ctx: &'a Arc<Context>) -> BoxFuture<'a, ValidationResult<Value>> {
        Box::pin(async move {
            match self.run(ctx).await {
                Ok(()) => {
                    let value = ctx.value().await;
                    ctx.settle(value.clone());
                    Ok(value)
                }
                Err(e) => {
                    ctx.fail();
                    Err(e)
                }
            }
        })
    }

    async fn run(&self, ctx: &Arc<Context>) -> ValidationResult<()> {
        if let Some(base) = self.settings.get(base::BASE) {
            let value = settings::resolve_setting(base, ctx)
                .await
                .map_err(|e| self.reference_error(ctx, Value::Null, e))?
                .map(|resolved| resolved.to_json())
                .unwrap_or(Value::Null);
            ctx.set_value(value).await;
        }

        let value = ctx.value().await;
        if let Some(reference) = Reference::from_data(&value) {
            if reference.is_external() && !ctx.options().external_data_refs {
                return Err(self.error_with(
                    ctx,
                    value,
                    "External references are not allowed in the data",
                ));
            }
            trace!("Resolving data reference at '{}'", ctx.source());
            let resolved = reference
                .resolve(ctx)
                .await
                .map_err(|e| self.reference_error(ctx, value, e))?;
            ctx.set_value(resolved.unwrap_or(Value::Null)).await;
        }

        // the base was already resolved above
        let settings = match self.settings.resolve_except(ctx, &[base::BASE]).await {
            Ok(settings) => settings,
            Err(e) => {
                let value = ctx.value().await;
                return Err(self.reference_error(ctx, value, e));
            }
        };

        for rule in self.rules.iter() {
            trace!("Running rule '{}' at '{}'", rule.name, ctx.source());
            if (rule.validate)(self, &settings, ctx).await? == Flow::Stop {
                trace!("Rule '{}' stopped the pipeline", rule.name);
                break;
            }
        }
        Ok(())
    }

    /// Build an error for the current value of `ctx`.
    pub async fn error(&self, ctx: &Context, message: impl Into<String>) -> ValidationError {
        let value = ctx.value().await;
        self.error_with(ctx, value, message)
    }

    /// Build an error for `value` at the position of `ctx`.
    pub fn error_with(
        &self,
        ctx: &Context,
        value: Value,
        message: impl Into<String>,
    ) -> ValidationError {
        ValidationError::new(
            self.label(),
            self.describe(),
            ctx.source(),
            value,
            message,
        )
    }

    fn reference_error(&self, ctx: &Context, value: Value, error: ReferenceError) -> ValidationError {
        self.error_with(ctx, value, format!("Could not resolve reference: {}", error))
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("kind", &self.kind)
            .field("settings", &self.settings)
            .field("rules", &self.rules.names())
            .finish()
    }
}
