//! Common test utilities for pipeline, reference and logic testing.
//!
//! This module provides assertion macros, data builders and fixtures shared
//! by the integration tests.

use serde_json::Value;

pub mod builders;
pub mod fixtures;

/// Custom assertion macro for failed validation runs, evaluates to the error
#[macro_export]
macro_rules! assert_validation_error {
    ($result:expr) => {
        match $result {
            Err(err) => err,
            Ok(value) => panic!(
                "Expected validation error, but validation passed with {}",
                value
            ),
        }
    };
}

/// Custom assertion macro for specific error messages
#[macro_export]
macro_rules! assert_error_message_contains {
    ($result:expr, $substring:expr) => {
        match $result {
            Err(err) => assert!(
                err.to_string().contains($substring),
                "Error message '{}' does not contain '{}'",
                err.to_string(),
                $substring
            ),
            Ok(_) => panic!(
                "Expected error containing '{}', but validation passed",
                $substring
            ),
        }
    };
}

/// Custom assertion macro for successful validation
#[macro_export]
macro_rules! assert_validation_success {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(err) => panic!(
                "Expected validation to succeed, but got error: {}",
                err.text()
            ),
        }
    };
    ($result:expr, $expected:expr) => {
        match $result {
            Ok(value) => assert_eq!(value, $expected),
            Err(err) => panic!(
                "Expected validation to succeed, but got error: {}",
                err.text()
            ),
        }
    };
}

/// Route library logging to the test output, once per binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Set `value` at a slash separated `path`, creating objects on the way.
pub fn set_path(mut base: Value, path: &str, value: Value) -> Value {
    let mut target = &mut base;
    for part in path.split('/').filter(|p| !p.is_empty()) {
        if !target.is_object() {
            *target = Value::Object(Default::default());
        }
        target = &mut target[part];
    }
    *target = value;
    base
}
