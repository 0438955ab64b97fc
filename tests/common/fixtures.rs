//! Inline JSON fixtures.

use serde_json::{Value, json};

/// A configuration document using data references between keys.
pub fn server_config() -> Value {
    json!({
        "host": " example.org ",
        "port": "8080",
        "admin_port": {"$ref": "../port"},
        "limits": {
            "min": 1,
            "max": {"$ref": "/limits/min"}
        }
    })
}

/// A valid address.
pub fn address() -> Value {
    json!({
        "street": "  Main Street 1 ",
        "zip": "80331",
        "country": "de"
    })
}
