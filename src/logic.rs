//! Logic combinators over schemas.
//!
//! A [`LogicSchema`] holds a chain of `(operator, schema)` entries in one
//! setting. Two chain shapes exist:
//!
//! - `allow`/`deny` followed by any number of `and`/`or` entries. `and` binds
//!   to its left neighbour, `or` starts a new alternative.
//! - `if` followed by an optional `then` and an optional `else`.
//!
//! At validation time the chain is turned into a [`Node`] tree and evaluated
//! by one recursive interpreter. Every sub-schema validates a fork of the
//! context, so only the final outcome reaches the validated value. The chain
//! runs ahead of the optional stage, so absent values reach the sub-schemas
//! and they decide about defaults and required values themselves.
//!
//! # Examples
//!
//! ```rust
//! use schema_pipeline::{LogicSchema, NumberSchema, SchemaType, StringSchema};
//! use regex::Regex;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # tokio_test::block_on(async {
//! let schema = LogicSchema::new()
//!     .allow(StringSchema::new().replace(Regex::new("_")?, ""))?
//!     .and(NumberSchema::new())?;
//! assert_eq!(schema.validate(json!("5_5")).await?, json!(55));
//! assert!(schema.validate(json!("5-5")).await.is_err());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # })
//! # }
//! ```

use crate::context::Context;
use crate::error::{ConfigError, ConfigResult, ValidationResult};
use crate::schema::{Flow, Resolved, ResolvedSettings, Rule, Schema, SchemaType, Setting, Settings};
use futures::future::{BoxFuture, join_all};
use log::debug;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Setting holding the logic chain.
pub const LOGIC: &str = "logic";

/// Position of an entry in a logic chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Allow,
    Deny,
    And,
    Or,
    If,
    Then,
    Else,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Allow => "allow",
            Operator::Deny => "deny",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::If => "if",
            Operator::Then => "then",
            Operator::Else => "else",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "allow" => Some(Operator::Allow),
            "deny" => Some(Operator::Deny),
            "and" => Some(Operator::And),
            "or" => Some(Operator::Or),
            "if" => Some(Operator::If),
            "then" => Some(Operator::Then),
            "else" => Some(Operator::Else),
            _ => None,
        }
    }

    fn is_leading(&self) -> bool {
        matches!(self, Operator::Allow | Operator::Deny | Operator::If)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(operator, schema)` pair of a chain.
#[derive(Debug, Clone)]
pub struct LogicEntry {
    pub operator: Operator,
    pub schema: Arc<Schema>,
}

impl LogicEntry {
    fn to_setting(&self) -> Setting {
        Setting::List(vec![
            Setting::from(self.operator.as_str()),
            Setting::Schema(self.schema.clone()),
        ])
    }

    fn from_setting(setting: &Setting) -> Option<Self> {
        match setting {
            Setting::List(pair) => match pair.as_slice() {
                [Setting::Value(Value::String(op)), Setting::Schema(schema)] => Some(Self {
                    operator: Operator::parse(op)?,
                    schema: schema.clone(),
                }),
                _ => None,
            },
            _ => None,
        }
    }

    fn from_resolved(resolved: &Resolved) -> Option<Self> {
        match resolved.as_list()? {
            [op, Resolved::Schema(schema)] => Some(Self {
                operator: Operator::parse(op.as_str()?)?,
                schema: schema.clone(),
            }),
            _ => None,
        }
    }
}

/// Check that `next` may follow `chain`.
fn check_chain(chain: &[LogicEntry], next: Operator) -> ConfigResult<()> {
    let Some(first) = chain.first().map(|entry| entry.operator) else {
        if next.is_leading() {
            return Ok(());
        }
        return Err(ConfigError::invalid_logic(format!(
            "a chain has to start with allow, deny or if, not {}",
            next
        )));
    };
    match next {
        Operator::Allow | Operator::Deny | Operator::If => Err(ConfigError::invalid_logic(
            format!("{} can only start a chain, it already starts with {}", next, first),
        )),
        Operator::And | Operator::Or if first == Operator::If => Err(
            ConfigError::invalid_logic(format!("{} is not possible after if", next)),
        ),
        Operator::And | Operator::Or => Ok(()),
        Operator::Then | Operator::Else if first != Operator::If => Err(
            ConfigError::invalid_logic(format!("{} needs a leading if", next)),
        ),
        Operator::Then | Operator::Else => {
            if chain.iter().any(|entry| entry.operator == next) {
                Err(ConfigError::invalid_logic(format!("{} can only be given once", next)))
            } else {
                Ok(())
            }
        }
    }
}

/// Evaluation tree of a logic chain.
#[derive(Debug, Clone)]
pub enum Node {
    /// Validate a fork holding the input value
    Check(Arc<Schema>),
    /// Each member validates the result of its left neighbour
    And(Vec<Node>),
    /// First succeeding alternative wins
    Or(Vec<Node>),
    /// The inner result becomes the value
    Allow(Box<Node>),
    /// Inner success is a failure and the other way round
    Deny(Box<Node>),
    If {
        test: Box<Node>,
        then: Option<Box<Node>>,
        otherwise: Option<Box<Node>>,
    },
}

impl Node {
    /// Build the tree of a valid chain. Returns `None` for an empty chain.
    pub fn build(entries: &[LogicEntry]) -> Option<Node> {
        let (first, rest) = entries.split_first()?;
        let check = |entry: &LogicEntry| Node::Check(entry.schema.clone());
        let node = match first.operator {
            Operator::If => {
                let branch = |op: Operator| {
                    rest.iter()
                        .find(|entry| entry.operator == op)
                        .map(|entry| Box::new(check(entry)))
                };
                Node::If {
                    test: Box::new(check(first)),
                    then: branch(Operator::Then),
                    otherwise: branch(Operator::Else),
                }
            }
            op => {
                let mut groups: Vec<Vec<Node>> = vec![vec![check(first)]];
                for entry in rest {
                    match entry.operator {
                        Operator::Or => groups.push(vec![check(entry)]),
                        _ => {
                            if let Some(group) = groups.last_mut() {
                                group.push(check(entry));
                            }
                        }
                    }
                }
                let mut alternatives: Vec<Node> = groups
                    .into_iter()
                    .map(|mut group| {
                        if group.len() == 1 {
                            group.remove(0)
                        } else {
                            Node::And(group)
                        }
                    })
                    .collect();
                let inner = if alternatives.len() == 1 {
                    alternatives.remove(0)
                } else {
                    Node::Or(alternatives)
                };
                if op == Operator::Deny {
                    Node::Deny(Box::new(inner))
                } else {
                    Node::Allow(Box::new(inner))
                }
            }
        };
        Some(node)
    }

    /// Evaluate against `value` at the position of `ctx`.
    ///
    /// `owner` is the logic schema, used for errors raised by the tree itself.
    pub fn eval<'a>(
        &'a self,
        owner: &'a Schema,
        ctx: &'a Arc<Context>,
        value: Value,
    ) -> BoxFuture<'a, ValidationResult<Value>> {
        Box::pin(async move {
            match self {
                Node::Check(schema) => {
                    let fork = ctx.fork(value).await;
                    schema.check(&fork).await
                }
                Node::And(nodes) => {
                    let mut value = value;
                    for node in nodes {
                        value = node.eval(owner, ctx, value).await?;
                    }
                    Ok(value)
                }
                Node::Or(nodes) => {
                    let results =
                        join_all(nodes.iter().map(|node| node.eval(owner, ctx, value.clone())))
                            .await;
                    let mut last_error = None;
                    for result in results {
                        match result {
                            Ok(value) => return Ok(value),
                            Err(e) => last_error = Some(e),
                        }
                    }
                    match last_error {
                        Some(e) => Err(e),
                        None => Ok(value),
                    }
                }
                Node::Allow(inner) => inner.eval(owner, ctx, value).await,
                Node::Deny(inner) => match inner.eval(owner, ctx, value.clone()).await {
                    Ok(_) => {
                        debug!("Deny matched at '{}'", ctx.source());
                        Err(owner.error_with(ctx, value, "denied by logic"))
                    }
                    Err(_) => Ok(value),
                },
                Node::If {
                    test,
                    then,
                    otherwise,
                } => {
                    let passed = test.eval(owner, ctx, value.clone()).await.is_ok();
                    debug!(
                        "Condition at '{}' {}",
                        ctx.source(),
                        if passed { "matched" } else { "did not match" }
                    );
                    let branch = if passed { then } else { otherwise };
                    match branch {
                        Some(node) => node.eval(owner, ctx, value).await,
                        None => Ok(value),
                    }
                }
            }
        })
    }
}

fn describe_logic(settings: &Settings) -> Option<String> {
    let Some(Setting::List(items)) = settings.get(LOGIC) else {
        return None;
    };
    let parts: Vec<String> = items
        .iter()
        .filter_map(LogicEntry::from_setting)
        .map(|entry| {
            let text = entry.schema.describe();
            match entry.operator {
                Operator::Allow => format!("It has to match ({})", text),
                Operator::Deny => format!("It must not match ({})", text),
                Operator::And => format!("and ({})", text),
                Operator::Or => format!("or ({})", text),
                Operator::If => format!("If it matches ({})", text),
                Operator::Then => format!("then it has to match ({})", text),
                Operator::Else => format!("otherwise it has to match ({})", text),
            }
        })
        .collect();
    (!parts.is_empty()).then(|| format!("{}.", parts.join(" ")))
}

fn validate_logic<'a>(
    schema: &'a Schema,
    settings: &'a ResolvedSettings,
    ctx: &'a Arc<Context>,
) -> BoxFuture<'a, ValidationResult<Flow>> {
    Box::pin(async move {
        let entries: Vec<LogicEntry> = settings
            .list(LOGIC)
            .unwrap_or_default()
            .iter()
            .filter_map(LogicEntry::from_resolved)
            .collect();
        let Some(node) = Node::build(&entries) else {
            return Ok(Flow::Continue);
        };
        let value = ctx.value().await;
        let result = node.eval(schema, ctx, value).await?;
        ctx.set_value(result).await;
        Ok(Flow::Continue)
    })
}

/// A schema combining other schemas.
#[derive(Debug, Clone)]
pub struct LogicSchema {
    schema: Schema,
}

impl LogicSchema {
    pub fn new() -> Self {
        Self {
            schema: Schema::with_leading_stages(
                "logic",
                [Rule::new(LOGIC, describe_logic, validate_logic)],
            ),
        }
    }

    /// The chain in declaration order.
    pub fn entries(&self) -> Vec<LogicEntry> {
        match self.schema.settings().get(LOGIC) {
            Some(Setting::List(items)) => items.iter().filter_map(LogicEntry::from_setting).collect(),
            _ => Vec::new(),
        }
    }

    fn push(mut self, operator: Operator, schema: impl SchemaType) -> ConfigResult<Self> {
        let mut entries = self.entries();
        check_chain(&entries, operator)?;
        entries.push(LogicEntry {
            operator,
            schema: Arc::new(schema.into_schema()),
        });
        let chain = entries.iter().map(LogicEntry::to_setting).collect();
        self.schema.set(LOGIC, Setting::List(chain));
        Ok(self)
    }

    /// Start a chain that must match.
    pub fn allow(self, schema: impl SchemaType) -> ConfigResult<Self> {
        self.push(Operator::Allow, schema)
    }

    /// Start a chain that must not match.
    pub fn deny(self, schema: impl SchemaType) -> ConfigResult<Self> {
        self.push(Operator::Deny, schema)
    }

    /// Require `schema` to match the result of the previous entry as well.
    pub fn and(self, schema: impl SchemaType) -> ConfigResult<Self> {
        self.push(Operator::And, schema)
    }

    /// Add an alternative.
    pub fn or(self, schema: impl SchemaType) -> ConfigResult<Self> {
        self.push(Operator::Or, schema)
    }

    /// Start a conditional chain.
    pub fn when(self, schema: impl SchemaType) -> ConfigResult<Self> {
        self.push(Operator::If, schema)
    }

    /// Schema applied when the condition matched.
    pub fn then(self, schema: impl SchemaType) -> ConfigResult<Self> {
        self.push(Operator::Then, schema)
    }

    /// Schema applied when the condition did not match.
    pub fn otherwise(self, schema: impl SchemaType) -> ConfigResult<Self> {
        self.push(Operator::Else, schema)
    }
}

impl Default for LogicSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaType for LogicSchema {
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
