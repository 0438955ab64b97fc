//! Deferred values.
//!
//! A [`Reference`] describes where a value comes from instead of holding it:
//! the validated data around the current position, a literal structure, a
//! computed value, or an external resource such as an environment variable.
//! The value is only produced when the reference is resolved, and a chain of
//! [`Access`] operations (path lookup, trimming, splitting, ...) is applied to
//! it in order.
//!
//! # Examples
//!
//! ```rust
//! use schema_pipeline::Reference;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let reference = Reference::value(json!({"a": {"b": 1}})).path("a/b");
//! assert_eq!(reference.resolve_in(&json!(null)).await.unwrap(), Some(json!(1)));
//! # });
//! ```
//!
//! Inside validated data a reference is written as `{"$ref": "<expression>"}`,
//! where the expression is a path relative to the current position or an
//! external URI such as `env://HOME` (see [`Reference::parse`]).

pub mod path;
pub mod resolver;

pub use resolver::{CommandResolver, EnvResolver, FileResolver, Resolver, Resolvers};

use crate::context::Context;
use crate::error::{ReferenceError, ReferenceResult};
use futures::future::BoxFuture;
use log::trace;
use path::Path;
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::fmt;
use std::sync::Arc;

/// Key marking a reference object inside validated data.
pub const REF_KEY: &str = "$ref";

/// Producer of a computed base value.
pub type ValueFn = Arc<dyn Fn() -> BoxFuture<'static, ReferenceResult<Value>> + Send + Sync>;

/// Transformation applied by [`Access::Map`].
pub type MapFn = Arc<dyn Fn(Value) -> ReferenceResult<Value> + Send + Sync>;

/// Where a reference starts.
#[derive(Clone)]
pub enum Base {
    /// The validation context the reference is resolved in
    Context,
    /// A literal structure
    Value(Value),
    /// A computed value
    Function(ValueFn),
    /// An external resource, `scheme://location`
    External(String),
}

/// One operation in a reference's access chain.
#[derive(Clone)]
pub enum Access {
    /// Navigate a path expression
    Path(String),
    /// Keys of an object (indexes of an array)
    Keys,
    /// Values of an object
    Values,
    /// Trim whitespace of a string or of every string in a list
    Trim,
    /// Split a string into a list
    Split(String),
    /// Join a list into a string
    Join(String),
    /// Keep strings matching the pattern
    Matches(Regex),
    /// Slice a list or string
    Range(usize, Option<usize>),
    /// Parse a string as JSON
    Parse,
    /// Convert to a number
    Number,
    /// Apply a function
    Map(MapFn),
    /// Use another reference if the value is undefined
    Or(Box<Reference>),
}

/// A deferred value: a base plus an ordered chain of access operations.
#[derive(Clone)]
pub struct Reference {
    base: Base,
    access: Vec<Access>,
}

/// Intermediate state while folding the access chain.
enum Cursor {
    Context(Arc<Context>),
    Data(Option<Value>),
}

impl Cursor {
    async fn into_data(self) -> Option<Value> {
        match self {
            Cursor::Context(ctx) => Some(ctx.value().await),
            Cursor::Data(data) => data,
        }
    }
}

impl Reference {
    /// A reference to the validation context it is resolved in.
    pub fn new() -> Self {
        Self::with_base(Base::Context)
    }

    /// A reference into a literal structure.
    pub fn value(value: Value) -> Self {
        Self::with_base(Base::Value(value))
    }

    /// A reference to a computed value.
    pub fn function<F>(f: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, ReferenceResult<Value>> + Send + Sync + 'static,
    {
        Self::with_base(Base::Function(Arc::new(f)))
    }

    /// A reference to an external resource like `env://HOME`.
    pub fn external(uri: impl Into<String>) -> Self {
        Self::with_base(Base::External(uri.into()))
    }

    fn with_base(base: Base) -> Self {
        Self {
            base,
            access: Vec::new(),
        }
    }

    /// Parse a reference expression.
    ///
    /// Expressions containing `://` are external URIs, anything else is a
    /// path relative to the validation context.
    pub fn parse(expression: &str) -> Self {
        if expression.contains("://") {
            Self::external(expression)
        } else {
            Self::new().path(expression)
        }
    }

    /// Detect a `{"$ref": "..."}` object inside validated data.
    pub fn from_data(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) if map.len() == 1 => {
                map.get(REF_KEY).and_then(Value::as_str).map(Self::parse)
            }
            _ => None,
        }
    }

    /// The base of this reference.
    pub fn base(&self) -> &Base {
        &self.base
    }

    /// Whether the value comes from an external resolver.
    pub fn is_external(&self) -> bool {
        matches!(self.base, Base::External(_))
    }

    /// The access chain of this reference.
    pub fn access(&self) -> &[Access] {
        &self.access
    }

    fn push(mut self, access: Access) -> Self {
        self.access.push(access);
        self
    }

    /// Navigate a path expression, see [`path`] for the syntax.
    pub fn path(self, path: impl Into<String>) -> Self {
        self.push(Access::Path(path.into()))
    }

    /// List the keys of an object.
    pub fn keys(self) -> Self {
        self.push(Access::Keys)
    }

    /// List the values of an object.
    pub fn values(self) -> Self {
        self.push(Access::Values)
    }

    /// Trim whitespace.
    pub fn trim(self) -> Self {
        self.push(Access::Trim)
    }

    /// Split a string by `separator`.
    pub fn split(self, separator: impl Into<String>) -> Self {
        self.push(Access::Split(separator.into()))
    }

    /// Join a list with `separator`.
    pub fn join(self, separator: impl Into<String>) -> Self {
        self.push(Access::Join(separator.into()))
    }

    /// Keep only strings matching `pattern`.
    pub fn matches(self, pattern: Regex) -> Self {
        self.push(Access::Matches(pattern))
    }

    /// Slice a list or string from `start` up to `end` (exclusive).
    pub fn range(self, start: usize, end: Option<usize>) -> Self {
        self.push(Access::Range(start, end))
    }

    /// Parse a string as JSON.
    pub fn parse_json(self) -> Self {
        self.push(Access::Parse)
    }

    /// Convert to a number.
    pub fn number(self) -> Self {
        self.push(Access::Number)
    }

    /// Transform the value with a function.
    pub fn map<F>(self, f: F) -> Self
    where
        F: Fn(Value) -> ReferenceResult<Value> + Send + Sync + 'static,
    {
        self.push(Access::Map(Arc::new(f)))
    }

    /// Fall back to `other` if the value is undefined at this point.
    pub fn or(self, other: Reference) -> Self {
        self.push(Access::Or(Box::new(other)))
    }

    /// Resolve against a validation context.
    ///
    /// Returns `None` if the reference points to nothing.
    pub fn resolve<'a>(
        &'a self,
        ctx: &'a Arc<Context>,
    ) -> BoxFuture<'a, ReferenceResult<Option<Value>>> {
        Box::pin(async move {
            let mut cursor = match &self.base {
                Base::Context => Cursor::Context(ctx.clone()),
                Base::Value(value) => Cursor::Data(Some(value.clone())),
                Base::Function(f) => Cursor::Data(Some(f().await?)),
                Base::External(uri) => {
                    Cursor::Data(Some(ctx.options().resolvers.resolve(uri).await?))
                }
            };
            for access in &self.access {
                cursor = apply(access, cursor, ctx).await?;
            }
            let value = cursor.into_data().await;
            trace!("Resolved {} at '{}' to {:?}", self, ctx.source(), value);
            Ok(value)
        })
    }

    /// Resolve against an arbitrary structure.
    ///
    /// The structure acts as the root of a detached validation context with
    /// default options.
    pub async fn resolve_in(&self, data: &Value) -> ReferenceResult<Option<Value>> {
        let ctx = Context::detached(data.clone());
        self.resolve(&ctx).await
    }
}

impl Default for Reference {
    fn default() -> Self {
        Self::new()
    }
}

async fn apply(access: &Access, cursor: Cursor, ctx: &Arc<Context>) -> ReferenceResult<Cursor> {
    if let Access::Path(expression) = access {
        return navigate(expression, cursor).await.map(Cursor::Data);
    }
    let data = cursor.into_data().await;
    let result = match access {
        Access::Path(_) => data,
        Access::Or(other) => match data {
            Some(value) => Some(value),
            None => other.resolve(ctx).await?,
        },
        Access::Map(f) => match data {
            Some(value) => Some(f(value)?),
            None => None,
        },
        _ => match data {
            Some(value) => transform(access, value)?,
            None => None,
        },
    };
    Ok(Cursor::Data(result))
}

async fn navigate(expression: &str, cursor: Cursor) -> ReferenceResult<Option<Value>> {
    let path = Path::parse(expression);
    match cursor {
        Cursor::Data(None) => Ok(None),
        Cursor::Data(Some(value)) => Ok(path.select(&value, &[])),
        Cursor::Context(ctx) => {
            let target = if path.absolute {
                ctx.root().ok_or_else(|| ReferenceError::ContextDropped {
                    source_path: ctx.source().to_string(),
                })?
            } else {
                ctx
            };
            // values of the enclosing contexts, outermost first
            let mut above = Vec::new();
            let mut parent = target.parent();
            while above.len() < path.ascent() {
                let Some(context) = parent else {
                    break;
                };
                above.push(context.value().await);
                parent = context.parent();
            }
            above.reverse();
            let value = target.value().await;
            Ok(path.select(&value, &above))
        }
    }
}

fn transform(access: &Access, value: Value) -> ReferenceResult<Option<Value>> {
    let result = match access {
        Access::Keys => match value {
            Value::Object(map) => Some(Value::Array(map.keys().cloned().map(Value::String).collect())),
            Value::Array(list) => Some(Value::Array(
                (0..list.len()).map(|i| Value::from(i as u64)).collect(),
            )),
            _ => None,
        },
        Access::Values => match value {
            Value::Object(map) => Some(Value::Array(map.into_iter().map(|(_, v)| v).collect())),
            Value::Array(list) => Some(Value::Array(list)),
            _ => None,
        },
        Access::Trim => Some(map_strings(value, |s| s.trim().to_string())),
        Access::Split(separator) => match value {
            Value::String(s) => Some(Value::Array(
                s.split(separator.as_str())
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
            )),
            other => Some(other),
        },
        Access::Join(separator) => match value {
            Value::Array(list) => Some(Value::String(
                list.iter()
                    .map(text)
                    .collect::<Vec<_>>()
                    .join(separator),
            )),
            other => Some(other),
        },
        Access::Matches(regex) => match value {
            Value::String(s) if regex.is_match(&s) => Some(Value::String(s)),
            Value::Array(list) => Some(Value::Array(
                list.into_iter()
                    .filter(|item| item.as_str().is_some_and(|s| regex.is_match(s)))
                    .collect(),
            )),
            _ => None,
        },
        Access::Range(start, end) => {
            let bounds = |len: usize| {
                let end = match end {
                    Some(end) => (*end).min(len),
                    None => len,
                };
                ((*start).min(end), end)
            };
            match value {
                Value::Array(list) => {
                    let (start, end) = bounds(list.len());
                    Some(Value::Array(list[start..end].to_vec()))
                }
                Value::String(s) => {
                    let chars: Vec<char> = s.chars().collect();
                    let (start, end) = bounds(chars.len());
                    Some(Value::String(chars[start..end].iter().collect()))
                }
                _ => None,
            }
        }
        Access::Parse => match value {
            Value::String(s) => Some(serde_json::from_str(&s)?),
            other => Some(other),
        },
        Access::Number => match value {
            Value::Number(n) => Some(Value::Number(n)),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            _ => None,
        },
        Access::Path(_) | Access::Map(_) | Access::Or(_) => Some(value),
    };
    Ok(result)
}

fn map_strings(value: Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(&s)),
        Value::Array(list) => Value::Array(
            list.into_iter()
                .map(|item| match item {
                    Value::String(s) => Value::String(f(&s)),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.base {
            Base::Context => write!(f, "reference to data")?,
            Base::Value(value) => write!(f, "reference to {}", value)?,
            Base::Function(_) => write!(f, "reference to function")?,
            Base::External(uri) => write!(f, "reference to {}", uri)?,
        }
        for access in &self.access {
            write!(f, " -> {:?}", access)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reference({})", self)
    }
}

impl fmt::Debug for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Path(path) => write!(f, "path({})", path),
            Access::Keys => write!(f, "keys"),
            Access::Values => write!(f, "values"),
            Access::Trim => write!(f, "trim"),
            Access::Split(sep) => write!(f, "split({:?})", sep),
            Access::Join(sep) => write!(f, "join({:?})", sep),
            Access::Matches(regex) => write!(f, "matches({})", regex.as_str()),
            Access::Range(start, Some(end)) => write!(f, "range({}..{})", start, end),
            Access::Range(start, None) => write!(f, "range({}..)", start),
            Access::Parse => write!(f, "parse"),
            Access::Number => write!(f, "number"),
            Access::Map(_) => write!(f, "map"),
            Access::Or(other) => write!(f, "or({})", other),
        }
    }
}

/// Build a `{"$ref": expression}` object for use inside validated data.
pub fn data_ref(expression: &str) -> Value {
    let mut map = Map::new();
    map.insert(REF_KEY.to_string(), Value::String(expression.to_string()));
    Value::Object(map)
}
