//! The settings bag of a schema and its resolution.
//!
//! Declared settings ([`Setting`]) may contain [`Reference`]s anywhere. Before
//! the rules of a schema run, every setting is resolved against the current
//! context into a [`Resolved`] value, which has no reference variant, so rules
//! never need to check for deferred values themselves.

use super::Schema;
use crate::context::Context;
use crate::error::ReferenceResult;
use crate::reference::Reference;
use futures::future::{BoxFuture, join_all};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// A declared setting.
#[derive(Clone)]
pub enum Setting {
    /// On/off switch
    Flag(bool),
    /// Literal value
    Value(Value),
    /// Regular expression
    Pattern(Regex),
    /// Deferred value
    Reference(Reference),
    /// Ordered list, positions are significant
    List(Vec<Setting>),
    /// Unique values in insertion order
    Set(Vec<Setting>),
    /// Named entries
    Map(BTreeMap<String, Setting>),
    /// Nested schema
    Schema(Arc<Schema>),
}

impl Setting {
    /// The literal value, if this is one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Setting::Value(value) => Some(value),
            _ => None,
        }
    }

    /// The literal number, if this is one.
    pub fn as_f64(&self) -> Option<f64> {
        self.as_value().and_then(Value::as_f64)
    }

    /// The literal flag, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Setting::Flag(flag) => Some(*flag),
            Setting::Value(Value::Bool(flag)) => Some(*flag),
            _ => None,
        }
    }

    /// Whether this setting is deferred.
    pub fn is_reference(&self) -> bool {
        matches!(self, Setting::Reference(_))
    }

    fn same_literal(&self, other: &Setting) -> bool {
        match (self, other) {
            (Setting::Value(a), Setting::Value(b)) => a == b,
            (Setting::Flag(a), Setting::Flag(b)) => a == b,
            (Setting::Pattern(a), Setting::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }

    /// Build a set, dropping repeated literals but keeping first positions.
    pub fn set_of<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Setting>,
    {
        let mut unique: Vec<Setting> = Vec::new();
        for item in items.into_iter().map(Into::into) {
            if !unique.iter().any(|u| u.same_literal(&item)) {
                unique.push(item);
            }
        }
        Setting::Set(unique)
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Setting::Flag(flag) => write!(f, "{}", flag),
            Setting::Value(value) => write!(f, "{}", value),
            Setting::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
            Setting::Reference(reference) => write!(f, "{}", reference),
            Setting::List(items) | Setting::Set(items) => {
                let items: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Setting::Map(map) => {
                let items: Vec<String> = map.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "{{{}}}", items.join(", "))
            }
            Setting::Schema(schema) => write!(f, "{} schema", schema.kind()),
        }
    }
}

impl fmt::Debug for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Setting({})", self)
    }
}

impl From<bool> for Setting {
    fn from(flag: bool) -> Self {
        Setting::Flag(flag)
    }
}

impl From<Value> for Setting {
    fn from(value: Value) -> Self {
        Setting::Value(value)
    }
}

impl From<&str> for Setting {
    fn from(value: &str) -> Self {
        Setting::Value(Value::String(value.to_string()))
    }
}

impl From<String> for Setting {
    fn from(value: String) -> Self {
        Setting::Value(Value::String(value))
    }
}

impl From<i32> for Setting {
    fn from(value: i32) -> Self {
        Setting::Value(Value::from(value))
    }
}

impl From<i64> for Setting {
    fn from(value: i64) -> Self {
        Setting::Value(Value::from(value))
    }
}

impl From<usize> for Setting {
    fn from(value: usize) -> Self {
        Setting::Value(Value::from(value))
    }
}

impl From<f64> for Setting {
    fn from(value: f64) -> Self {
        Setting::Value(Value::from(value))
    }
}

impl From<Regex> for Setting {
    fn from(regex: Regex) -> Self {
        Setting::Pattern(regex)
    }
}

impl From<Reference> for Setting {
    fn from(reference: Reference) -> Self {
        Setting::Reference(reference)
    }
}

impl From<Schema> for Setting {
    fn from(schema: Schema) -> Self {
        Setting::Schema(Arc::new(schema))
    }
}

impl<T: Into<Setting>> From<Vec<T>> for Setting {
    fn from(items: Vec<T>) -> Self {
        Setting::List(items.into_iter().map(Into::into).collect())
    }
}

/// A setting after all references were resolved.
#[derive(Debug, Clone)]
pub enum Resolved {
    Flag(bool),
    Value(Value),
    Pattern(Regex),
    List(Vec<Resolved>),
    Map(BTreeMap<String, Resolved>),
    Schema(Arc<Schema>),
}

impl Resolved {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Resolved::Flag(flag) => Some(*flag),
            Resolved::Value(Value::Bool(flag)) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Resolved::Value(value) => value.as_str(),
            _ => None,
        }
    }

    /// Numbers, and strings holding a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Resolved::Value(Value::Number(n)) => n.as_f64(),
            Resolved::Value(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Resolved]> {
        match self {
            Resolved::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Resolved>> {
        match self {
            Resolved::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_schema(&self) -> Option<&Arc<Schema>> {
        match self {
            Resolved::Schema(schema) => Some(schema),
            _ => None,
        }
    }

    pub fn as_pattern(&self) -> Option<&Regex> {
        match self {
            Resolved::Pattern(regex) => Some(regex),
            _ => None,
        }
    }

    /// JSON form of the resolved setting. A resolved value that is itself
    /// a list keeps its array form.
    pub fn to_json(&self) -> Value {
        match self {
            Resolved::Flag(flag) => Value::Bool(*flag),
            Resolved::Value(value) => value.clone(),
            Resolved::Pattern(regex) => Value::String(regex.as_str().to_string()),
            Resolved::List(items) => Value::Array(items.iter().map(Resolved::to_json).collect()),
            Resolved::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
            Resolved::Schema(schema) => Value::String(schema.kind().to_string()),
        }
    }

    /// The items of a list setting; a single resolved array value counts too.
    pub fn items(&self) -> Vec<Value> {
        match self {
            Resolved::List(items) => items.iter().map(Resolved::to_json).collect(),
            Resolved::Value(Value::Array(items)) => items.clone(),
            other => vec![other.to_json()],
        }
    }
}

/// The declared settings of a schema.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    entries: HashMap<&'static str, Setting>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Setting> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Setting> {
        self.entries.get_mut(name)
    }

    pub fn set(&mut self, name: &'static str, setting: impl Into<Setting>) {
        self.entries.insert(name, setting.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Setting> {
        self.entries.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// A literal flag; unset flags and references count as `false`.
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).and_then(Setting::as_bool).unwrap_or(false)
    }

    /// A literal number; unset numbers and references give `None`.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Setting::as_f64)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Setting)> {
        self.entries.iter().map(|(name, setting)| (*name, setting))
    }

    /// Resolve every setting concurrently against `ctx`.
    ///
    /// A reference that resolves to nothing removes its setting.
    pub async fn resolve(&self, ctx: &Arc<Context>) -> ReferenceResult<ResolvedSettings> {
        self.resolve_except(ctx, &[]).await
    }

    /// Like [`resolve`](Self::resolve), leaving out the settings in `skip`.
    pub async fn resolve_except(
        &self,
        ctx: &Arc<Context>,
        skip: &[&str],
    ) -> ReferenceResult<ResolvedSettings> {
        let pending = self
            .entries
            .iter()
            .filter(|(name, _)| !skip.contains(*name))
            .map(|(name, setting)| async move { (*name, resolve_setting(setting, ctx).await) });
        let mut entries = HashMap::with_capacity(self.entries.len());
        for (name, result) in join_all(pending).await {
            if let Some(resolved) = result? {
                entries.insert(name, resolved);
            }
        }
        Ok(ResolvedSettings { entries })
    }
}

pub(crate) fn resolve_setting<'a>(
    setting: &'a Setting,
    ctx: &'a Arc<Context>,
) -> BoxFuture<'a, ReferenceResult<Option<Resolved>>> {
    Box::pin(async move {
        let resolved = match setting {
            Setting::Flag(flag) => Resolved::Flag(*flag),
            Setting::Value(value) => Resolved::Value(value.clone()),
            Setting::Pattern(regex) => Resolved::Pattern(regex.clone()),
            Setting::Schema(schema) => Resolved::Schema(schema.clone()),
            Setting::Reference(reference) => match reference.resolve(ctx).await? {
                Some(value) => Resolved::Value(value),
                None => return Ok(None),
            },
            Setting::List(items) | Setting::Set(items) => {
                let results = join_all(items.iter().map(|item| resolve_setting(item, ctx))).await;
                let mut list = Vec::with_capacity(results.len());
                for result in results {
                    list.push(result?.unwrap_or(Resolved::Value(Value::Null)));
                }
                Resolved::List(list)
            }
            Setting::Map(map) => {
                let results = join_all(
                    map.iter()
                        .map(|(key, item)| async move { (key, resolve_setting(item, ctx).await) }),
                )
                .await;
                let mut resolved = BTreeMap::new();
                for (key, result) in results {
                    if let Some(value) = result? {
                        resolved.insert(key.clone(), value);
                    }
                }
                Resolved::Map(resolved)
            }
        };
        Ok(Some(resolved))
    })
}

/// Settings of a schema for one validation run.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSettings {
    entries: HashMap<&'static str, Resolved>,
}

impl ResolvedSettings {
    pub fn get(&self, name: &str) -> Option<&Resolved> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.get(name).and_then(Resolved::as_bool).unwrap_or(false)
    }

    pub fn value(&self, name: &str) -> Option<Value> {
        self.get(name).map(Resolved::to_json)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Resolved::as_str)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Resolved::as_f64)
    }

    pub fn list(&self, name: &str) -> Option<&[Resolved]> {
        self.get(name).and_then(Resolved::as_list)
    }

    pub fn map(&self, name: &str) -> Option<&BTreeMap<String, Resolved>> {
        self.get(name).and_then(Resolved::as_map)
    }

    pub fn schema(&self, name: &str) -> Option<&Arc<Schema>> {
        self.get(name).and_then(Resolved::as_schema)
    }

    pub fn pattern(&self, name: &str) -> Option<&Regex> {
        self.get(name).and_then(Resolved::as_pattern)
    }
}
