//! External resolvers for references to environment variables, files and
//! command output.
//!
//! A resolver handles one URI scheme. [`Resolvers`] maps schemes to resolvers
//! and is carried by every validation run through
//! [`ValidateOptions`](crate::config::ValidateOptions). Callers can plug in
//! their own resolvers (for example an HTTP client) with [`Resolvers::with`].

use crate::config::ResolverConfig;
use crate::error::{ReferenceError, ReferenceResult};
use futures::future::BoxFuture;
use log::{trace, warn};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Resolves the location part of an external reference URI.
pub trait Resolver: Send + Sync {
    /// URI scheme handled by this resolver, e.g. `env`.
    fn scheme(&self) -> &str;

    /// Load the value behind `location` (the URI without `scheme://`).
    fn resolve<'a>(&'a self, location: &'a str) -> BoxFuture<'a, ReferenceResult<Value>>;
}

/// Reads `env://NAME`.
#[derive(Debug, Default)]
pub struct EnvResolver;

impl Resolver for EnvResolver {
    fn scheme(&self) -> &str {
        "env"
    }

    fn resolve<'a>(&'a self, location: &'a str) -> BoxFuture<'a, ReferenceResult<Value>> {
        Box::pin(async move {
            std::env::var(location)
                .map(Value::String)
                .map_err(|_| ReferenceError::MissingEnv {
                    name: location.to_string(),
                })
        })
    }
}

/// Reads `file://path` as text.
///
/// Only relative paths below the base directory (or the working directory)
/// are accepted.
#[derive(Debug, Default)]
pub struct FileResolver {
    base_dir: Option<PathBuf>,
}

impl FileResolver {
    /// Create a resolver reading relative paths from `base_dir`.
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self { base_dir }
    }
}

impl Resolver for FileResolver {
    fn scheme(&self) -> &str {
        "file"
    }

    fn resolve<'a>(&'a self, location: &'a str) -> BoxFuture<'a, ReferenceResult<Value>> {
        Box::pin(async move {
            let relative = Path::new(location);
            let escapes = relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
            if location.is_empty() || escapes {
                return Err(ReferenceError::InvalidLocation {
                    location: location.to_string(),
                });
            }
            let path = match &self.base_dir {
                Some(dir) => dir.join(relative),
                None => relative.to_path_buf(),
            };
            tokio::fs::read_to_string(&path)
                .await
                .map(Value::String)
                .map_err(|source| ReferenceError::Io {
                    location: path.display().to_string(),
                    source,
                })
        })
    }
}

/// Runs `cmd://command line` through `sh -c` and returns its standard output.
#[derive(Debug)]
pub struct CommandResolver {
    timeout: Duration,
}

impl CommandResolver {
    /// Create a resolver that gives up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Resolver for CommandResolver {
    fn scheme(&self) -> &str {
        "cmd"
    }

    fn resolve<'a>(&'a self, location: &'a str) -> BoxFuture<'a, ReferenceResult<Value>> {
        Box::pin(async move {
            let run = tokio::process::Command::new("sh")
                .arg("-c")
                .arg(location)
                .kill_on_drop(true)
                .output();
            let output = tokio::time::timeout(self.timeout, run)
                .await
                .map_err(|_| ReferenceError::Timeout {
                    location: location.to_string(),
                    millis: self.timeout.as_millis() as u64,
                })?
                .map_err(|source| ReferenceError::Io {
                    location: location.to_string(),
                    source,
                })?;
            if !output.status.success() {
                return Err(ReferenceError::Command {
                    command: location.to_string(),
                    message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }
            Ok(Value::String(
                String::from_utf8_lossy(&output.stdout).into_owned(),
            ))
        })
    }
}

/// Registry of resolvers by URI scheme.
#[derive(Clone)]
pub struct Resolvers {
    resolvers: HashMap<String, Arc<dyn Resolver>>,
    disabled: HashSet<String>,
}

impl Resolvers {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            resolvers: HashMap::new(),
            disabled: HashSet::new(),
        }
    }

    /// Build the built-in resolvers according to `config`.
    pub fn from_config(config: &ResolverConfig) -> Self {
        let mut resolvers = Self::empty();
        if config.allow_env {
            resolvers = resolvers.with(EnvResolver);
        } else {
            resolvers.disabled.insert("env".to_string());
        }
        if config.allow_file {
            resolvers = resolvers.with(FileResolver::new(config.base_dir.clone()));
        } else {
            resolvers.disabled.insert("file".to_string());
        }
        if config.allow_command {
            resolvers = resolvers.with(CommandResolver::new(config.command_timeout()));
        } else {
            resolvers.disabled.insert("cmd".to_string());
        }
        resolvers
    }

    /// Register a resolver, replacing any resolver for the same scheme.
    pub fn with(mut self, resolver: impl Resolver + 'static) -> Self {
        let scheme = resolver.scheme().to_string();
        self.disabled.remove(&scheme);
        self.resolvers.insert(scheme, Arc::new(resolver));
        self
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.resolvers.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// Resolve a `scheme://location` URI.
    pub async fn resolve(&self, uri: &str) -> ReferenceResult<Value> {
        let (scheme, location) =
            uri.split_once("://")
                .ok_or_else(|| ReferenceError::InvalidLocation {
                    location: uri.to_string(),
                })?;
        if self.disabled.contains(scheme) {
            return Err(ReferenceError::Disabled {
                scheme: scheme.to_string(),
            });
        }
        let resolver = self
            .resolvers
            .get(scheme)
            .ok_or_else(|| ReferenceError::UnknownScheme {
                scheme: scheme.to_string(),
            })?;
        trace!("Resolving external reference {}", uri);
        let result = resolver.resolve(location).await;
        if let Err(e) = &result {
            warn!("External reference {} failed: {}", uri, e);
        }
        result
    }
}

impl Default for Resolvers {
    fn default() -> Self {
        Self::from_config(&ResolverConfig::default())
    }
}

impl fmt::Debug for Resolvers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolvers")
            .field("schemes", &self.schemes())
            .field("disabled", &self.disabled)
            .finish()
    }
}
