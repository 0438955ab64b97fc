//! Test data builders.
//!
//! Fluent builders for nested test structures and for schemas used across
//! several test modules.

use regex::Regex;
use schema_pipeline::{LogicSchema, NumberSchema, ObjectSchema, SchemaType, StringSchema};
use serde_json::{Value, json};

/// Builder for a region tree: continent / country / region / city.
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    data: Value,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self { data: json!({}) }
    }

    /// Add a city with its population below the given path.
    pub fn city(mut self, path: &[&str], name: &str, population: u64) -> Self {
        let mut node = &mut self.data;
        for part in path {
            node = &mut node[*part];
        }
        node[name] = json!({ "population": population });
        self
    }

    pub fn build(self) -> Value {
        self.data
    }
}

/// The example tree used by path tests.
pub fn world() -> Value {
    TreeBuilder::new()
        .city(&["europe", "germany", "bavaria"], "munich", 1_500_000)
        .city(&["europe", "germany", "berlin"], "berlin", 3_600_000)
        .city(&["europe", "france", "idf"], "paris", 2_100_000)
        .city(&["asia", "japan", "kanto"], "tokyo", 14_000_000)
        .build()
}

/// `allow(String.replace(/_/, "")).and(Number)`
pub fn digits_logic() -> LogicSchema {
    LogicSchema::new()
        .allow(StringSchema::new().replace(Regex::new("_").unwrap(), ""))
        .unwrap()
        .and(NumberSchema::new())
        .unwrap()
}

/// An address record.
pub fn address_schema() -> ObjectSchema {
    ObjectSchema::new()
        .key(
            "street",
            StringSchema::new().trim(true).required(true).unwrap(),
        )
        .key(
            "zip",
            StringSchema::new()
                .pattern_str("^[0-9]+$")
                .unwrap()
                .required(true)
                .unwrap(),
        )
        .key(
            "country",
            StringSchema::new()
                .uppercase(true)
                .allow_values(vec!["DE", "FR"])
                .default_value("DE"),
        )
        .deny_unknown(true)
}
