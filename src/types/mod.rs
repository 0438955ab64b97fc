//! Leaf schema types built on the rule pipeline.
//!
//! Each type wraps a [`Schema`](crate::Schema) and places its own rules
//! between the base `optional` and `allow` stages, so type checks and
//! transformations always run before the allow and deny lists.

pub mod number;
pub mod object;
pub mod string;

pub use number::NumberSchema;
pub use object::ObjectSchema;
pub use string::StringSchema;
