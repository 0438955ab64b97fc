//! Runtime data validation built on a rule pipeline.
//!
//! Schemas are assembled with fluent setters and applied to any
//! `serde_json::Value`, returning the validated (and possibly transformed)
//! value or a [`ValidationError`] explaining what failed where.
//!
//! # Core Components
//!
//! - [`Schema`] - Settings bag plus ordered rules, shared by every schema type
//! - [`Reference`] - Deferred values resolved against the validated data,
//!   literal structures, functions or external resources
//! - [`LogicSchema`] - `allow`/`deny`/`and`/`or` and `if`/`then`/`else`
//!   combinations of other schemas
//! - [`Context`] - The value under validation with its position in the data
//!
//! # Quick Start
//!
//! ```rust
//! use schema_pipeline::{NumberSchema, ObjectSchema, Reference, SchemaType, StringSchema};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # tokio_test::block_on(async {
//! let schema = ObjectSchema::new()
//!     .key("name", StringSchema::new().trim(true).required(true)?)
//!     .key("min", NumberSchema::new())
//!     .key("max", NumberSchema::new().min(Reference::new().path("../min"))?);
//!
//! let value = schema
//!     .validate(json!({"name": " box ", "min": "2", "max": 5}))
//!     .await?;
//! assert_eq!(value, json!({"name": "box", "min": 2, "max": 5}));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # })
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod logic;
pub mod reference;
pub mod schema;
pub mod types;

// Re-export commonly used types for convenience
pub use config::{ResolverConfig, ValidateOptions};
pub use context::{Context, Status};
pub use error::{
    ConfigError, ConfigResult, Error, ReferenceError, ReferenceResult, Result, ValidationError,
    ValidationResult,
};
pub use logic::{LogicEntry, LogicSchema, Node, Operator};
pub use reference::{Access, Base, Reference, Resolver, Resolvers, data_ref};
pub use schema::{Flow, Resolved, ResolvedSettings, Rule, Rules, Schema, SchemaType, Setting, Settings};
pub use types::{NumberSchema, ObjectSchema, StringSchema};
