//! Error types for schema construction, reference resolution and validation runs.
//!
//! Three failure families are kept apart:
//!
//! - [`ConfigError`] is raised synchronously by setters when a schema
//!   definition contradicts itself. It is a programming error.
//! - [`ReferenceError`] is raised while resolving a [`Reference`](crate::Reference).
//! - [`ValidationError`] is the expected, recoverable outcome of `validate`.
//!
//! The "optional value is absent" case is not an error at all, see
//! [`Flow::Stop`](crate::schema::Flow).

use serde_json::Value;
use std::fmt;

/// Main error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Validation failed for the given data
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The schema definition is inconsistent
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A reference could not be resolved
    #[error("Reference error: {0}")]
    Reference(#[from] ReferenceError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while building a schema.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Two settings exclude each other
    #[error("Setting '{setting}' conflicts with '{other}'")]
    Conflict { setting: String, other: String },

    /// A lower bound exceeds its upper bound
    #[error("Setting '{min_name}' ({min}) is greater than '{max_name}' ({max})")]
    Range {
        min_name: String,
        min: f64,
        max_name: String,
        max: f64,
    },

    /// A regular expression failed to compile
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A logic chain was assembled in an invalid order
    #[error("Invalid logic chain: {message}")]
    InvalidLogic { message: String },

    /// A rule was inserted relative to a rule that does not exist
    #[error("Unknown rule anchor '{anchor}'")]
    UnknownAnchor { anchor: String },
}

impl ConfigError {
    /// Create a conflict error between two settings.
    pub fn conflict(setting: impl Into<String>, other: impl Into<String>) -> Self {
        Self::Conflict {
            setting: setting.into(),
            other: other.into(),
        }
    }

    /// Create an invalid logic chain error.
    pub fn invalid_logic(message: impl Into<String>) -> Self {
        Self::InvalidLogic {
            message: message.into(),
        }
    }
}

/// Errors raised while resolving a reference.
#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    /// A parent or root context was already dropped
    #[error("Context for '{source_path}' is no longer available")]
    ContextDropped { source_path: String },

    /// No resolver is registered for the scheme of an external reference
    #[error("No resolver registered for scheme '{scheme}'")]
    UnknownScheme { scheme: String },

    /// An external reference URI could not be parsed
    #[error("Invalid reference location '{location}'")]
    InvalidLocation { location: String },

    /// The resolver for this scheme is disabled by configuration
    #[error("Resolver '{scheme}' is disabled")]
    Disabled { scheme: String },

    /// Environment variable is not set
    #[error("Environment variable '{name}' is not set")]
    MissingEnv { name: String },

    /// Reading an external resource failed
    #[error("Could not read '{location}': {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    /// A command exited unsuccessfully
    #[error("Command '{command}' failed: {message}")]
    Command { command: String, message: String },

    /// An external resolver ran out of time
    #[error("Resolving '{location}' timed out after {millis} ms")]
    Timeout { location: String, millis: u64 },

    /// Parsing a resolved string as JSON failed
    #[error("Could not parse resolved value: {0}")]
    Parse(#[from] serde_json::Error),

    /// A user supplied function failed
    #[error("Reference function failed: {message}")]
    Function { message: String },
}

impl ReferenceError {
    /// Create a function failure error.
    pub fn function(message: impl Into<String>) -> Self {
        Self::Function {
            message: message.into(),
        }
    }
}

/// A failed validation run.
///
/// Carries the schema's self description, the data path and the offending
/// value so that [`text`](Self::text) can explain the failure without access
/// to the schema or context any more.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Title of the schema, if one was set
    pub title: Option<String>,
    /// Human readable description of the failing schema
    pub schema: String,
    /// Slash delimited path of the failing value
    pub source: String,
    /// The value at the moment the rule failed
    pub value: Value,
    /// What went wrong
    pub message: String,
}

impl ValidationError {
    /// Create a validation error.
    pub fn new(
        title: Option<String>,
        schema: impl Into<String>,
        source: impl Into<String>,
        value: Value,
        message: impl Into<String>,
    ) -> Self {
        Self {
            title,
            schema: schema.into(),
            source: source.into(),
            value,
            message: message.into(),
        }
    }

    /// Render a multi line explanation including value, path and schema.
    pub fn text(&self) -> String {
        let source = if self.source.is_empty() {
            "/"
        } else {
            self.source.as_str()
        };
        let mut text = match &self.title {
            Some(title) => format!("{}: {}\n", title, self.message),
            None => format!("{}\n", self.message),
        };
        text.push_str(&format!("> Given value: {} at {}\n", self.value, source));
        if !self.schema.is_empty() {
            text.push_str(&format!("> Expected: {}", self.schema));
        }
        text.trim_end().to_string()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.source.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{} at '{}'", self.message, self.source)
        }
    }
}

impl std::error::Error for ValidationError {}

// Result type aliases for convenience
pub type Result<T> = std::result::Result<T, Error>;
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
pub type ReferenceResult<T> = std::result::Result<T, ReferenceError>;
