use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "api": {
                "type": "object",
                "properties": {
                    "base_url": { "type": "string", "format": "uri" },
                    "timeout_secs": { "type": "integer", "minimum": 1 },
                    "max_retries": { "type": "integer", "minimum": 0, "maximum": 10 }
                }
            },
            "session": {
                "type": "object",
                "properties": {
                    "token_file": { "type": "string" },
                    "token": { "type": "string" },
                    "auth_bypass": { "type": "boolean" }
                }
            },
            "output": {
                "type": "object",
                "properties": {
                    "format": { "type": "string", "enum": ["text", "json"] },
                    "color": { "type": "boolean" }
                }
            }
        }
    })
});
