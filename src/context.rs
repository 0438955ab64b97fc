//! Validation context carried through one validation run.
//!
//! A [`Context`] wraps the value under validation together with everything a
//! rule or a [`Reference`](crate::Reference) needs to know about where that
//! value lives: the original input, the slash delimited source path, a scratch
//! map shared by the rules of one run, and weak links to the parent and root
//! contexts. Contexts form a tree that lives exactly as long as the run.

use crate::config::ValidateOptions;
use serde_json::{Map, Value};
use std::sync::{Arc, Weak};
use tokio::sync::{RwLock, watch};

/// Settlement state of a context.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    /// Validation is still running
    Pending,
    /// Validation finished with this value
    Settled(Value),
    /// Validation failed
    Failed,
}

/// The data of one validation run at one position in the validated structure.
#[derive(Debug)]
pub struct Context {
    value: RwLock<Value>,
    orig: Value,
    source: String,
    key: Option<String>,
    temp: RwLock<Map<String, Value>>,
    parent: Weak<Context>,
    root: Weak<Context>,
    status: watch::Sender<Status>,
    options: Arc<ValidateOptions>,
}

impl Context {
    /// Create a root context for a new validation run.
    pub fn new(value: Value, options: ValidateOptions) -> Arc<Self> {
        let source = options.source.clone();
        let options = Arc::new(options);
        Arc::new_cyclic(|root| Self {
            orig: value.clone(),
            value: RwLock::new(value),
            source,
            key: None,
            temp: RwLock::new(Map::new()),
            parent: Weak::new(),
            root: root.clone(),
            status: watch::channel(Status::Pending).0,
            options,
        })
    }

    /// Create a root context with default options.
    pub fn detached(value: Value) -> Arc<Self> {
        Self::new(value, ValidateOptions::default())
    }

    /// Create the context for `key` below this one.
    ///
    /// The child starts with the current value stored under `key` (an object
    /// key or an array index), or `Null` if there is none.
    pub async fn sub(self: &Arc<Self>, key: &str) -> Arc<Self> {
        let value = {
            let current = self.value.read().await;
            child(&current, key).cloned().unwrap_or(Value::Null)
        };
        Arc::new(Self {
            orig: value.clone(),
            value: RwLock::new(value),
            source: format!("{}/{}", self.source, key),
            key: Some(key.to_string()),
            temp: RwLock::new(Map::new()),
            parent: Arc::downgrade(self),
            root: self.root.clone(),
            status: watch::channel(Status::Pending).0,
            options: self.options.clone(),
        })
    }

    /// Create an independent copy holding `value`.
    ///
    /// The copy keeps source path, original value and links, so references
    /// resolved against it see the same surroundings. Changes to the copy
    /// never reach this context. Forking a root context yields a new root.
    pub async fn fork(self: &Arc<Self>, value: Value) -> Arc<Self> {
        let temp = self.temp.read().await.clone();
        if self.is_root() {
            return Arc::new_cyclic(|root| Self {
                orig: self.orig.clone(),
                value: RwLock::new(value),
                source: self.source.clone(),
                key: None,
                temp: RwLock::new(temp),
                parent: Weak::new(),
                root: root.clone(),
                status: watch::channel(Status::Pending).0,
                options: self.options.clone(),
            });
        }
        Arc::new(Self {
            orig: self.orig.clone(),
            value: RwLock::new(value),
            source: self.source.clone(),
            key: self.key.clone(),
            temp: RwLock::new(temp),
            parent: self.parent.clone(),
            root: self.root.clone(),
            status: watch::channel(Status::Pending).0,
            options: self.options.clone(),
        })
    }

    /// Current value.
    pub async fn value(&self) -> Value {
        self.value.read().await.clone()
    }

    /// Replace the current value.
    pub async fn set_value(&self, value: Value) {
        *self.value.write().await = value;
    }

    /// Modify the current value in place.
    pub async fn update<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
        let mut value = self.value.write().await;
        f(&mut value)
    }

    /// The value as it was when this context was created.
    pub fn orig(&self) -> &Value {
        &self.orig
    }

    /// Slash delimited path of this context.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Key of this context within its parent.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Options of the running validation.
    pub fn options(&self) -> &ValidateOptions {
        &self.options
    }

    /// The parent context, `None` for a root context.
    pub fn parent(&self) -> Option<Arc<Self>> {
        self.parent.upgrade()
    }

    /// The root context of this run.
    pub fn root(&self) -> Option<Arc<Self>> {
        self.root.upgrade()
    }

    /// Whether this context is the root of its tree.
    pub fn is_root(&self) -> bool {
        self.key.is_none()
    }

    /// Read a scratch value stored by an earlier rule of this run.
    pub async fn temp(&self, name: &str) -> Option<Value> {
        self.temp.read().await.get(name).cloned()
    }

    /// Store a scratch value for later rules of this run.
    pub async fn set_temp(&self, name: impl Into<String>, value: Value) {
        self.temp.write().await.insert(name.into(), value);
    }

    /// Current settlement state.
    pub fn status(&self) -> Status {
        self.status.borrow().clone()
    }

    /// Mark the context as successfully validated.
    pub fn settle(&self, value: Value) {
        self.status.send_replace(Status::Settled(value));
    }

    /// Mark the context as failed.
    pub fn fail(&self) {
        self.status.send_replace(Status::Failed);
    }

    /// Wait until the context is settled.
    ///
    /// Returns the final value, or `None` if validation failed.
    pub async fn settled(&self) -> Option<Value> {
        let mut receiver = self.status.subscribe();
        let status = match receiver.wait_for(|s| *s != Status::Pending).await {
            Ok(status) => status.clone(),
            Err(_) => return None,
        };
        match status {
            Status::Settled(value) => Some(value),
            _ => None,
        }
    }
}

/// Look up an object key or array index.
pub(crate) fn child<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(list) => key.parse::<usize>().ok().and_then(|i| list.get(i)),
        _ => None,
    }
}
