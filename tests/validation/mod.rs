//! Validation tests module.
//!
//! End to end tests of the rule pipeline, reference resolution and logic
//! combinators, organized by concern.

pub mod logic;
pub mod pipeline;
pub mod properties;
pub mod references;

// Re-export commonly used test utilities
pub use crate::common::{
    builders::{TreeBuilder, address_schema, digits_logic, world},
    fixtures::{address, server_config},
    init_logging, set_path,
};

// Re-export assertion macros
pub use crate::{
    assert_error_message_contains, assert_validation_error, assert_validation_success,
};
