//! Configuration for validation runs and external reference resolvers.
//!
//! [`ResolverConfig`] controls which external sources references may read
//! from and is usually loaded from a JSON document. [`ValidateOptions`] is the
//! per-run configuration handed to [`Schema::validate_with`](crate::Schema::validate_with).

use crate::error::Result;
use crate::reference::Resolvers;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Settings for the built-in external resolvers.
///
/// # Examples
///
/// ```rust
/// use schema_pipeline::config::ResolverConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ResolverConfig::from_json(r#"{ "allowCommand": true, "commandTimeoutMs": 500 }"#)?;
/// assert!(config.allow_command);
/// assert!(config.allow_env);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverConfig {
    /// Allow `env://NAME` references
    pub allow_env: bool,
    /// Allow `file://path` references
    pub allow_file: bool,
    /// Allow `cmd://command` references
    pub allow_command: bool,
    /// Directory relative file references are read from
    pub base_dir: Option<PathBuf>,
    /// Upper bound for a single command reference
    pub command_timeout_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            allow_env: true,
            allow_file: true,
            allow_command: false,
            base_dir: None,
            command_timeout_ms: 5_000,
        }
    }
}

impl ResolverConfig {
    /// Parse a configuration from JSON, missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Command timeout as a [`Duration`].
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

/// Options for a single validation run.
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    /// Path prefix used for error messages and the root context's source
    pub source: String,
    /// Resolvers available to external references during this run
    pub resolvers: Resolvers,
    /// Whether `{"$ref": "scheme://..."}` values inside the validated data
    /// may reach the resolvers. Off by default, so input data can only
    /// reference other parts of itself.
    pub external_data_refs: bool,
}

impl ValidateOptions {
    /// Create options with the default resolvers and an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source path of the validated data.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Replace the resolver registry.
    pub fn with_resolvers(mut self, resolvers: Resolvers) -> Self {
        self.resolvers = resolvers;
        self
    }

    /// Let external references written inside the data reach the resolvers.
    pub fn with_external_data_refs(mut self, allow: bool) -> Self {
        self.external_data_refs = allow;
        self
    }
}
