//! The JSON Schema every submitted plan document must satisfy.
//!
//! Only shape is checked here: the mode enum, that `actions` and `nodes` are
//! arrays of tagged objects, that edges name a source and a target. Which
//! fields each action kind needs is checked afterwards, per action.

use serde_json::{json, Value};

pub fn plan_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": ["mode"],
        "properties": {
            "mode": { "enum": ["simulate", "execute"] },
            "planId": { "type": "string" },
            "actions": {
                "type": "array",
                "items": { "$ref": "#/$defs/action" }
            },
            "nodes": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["id", "action"],
                    "properties": {
                        "id": { "type": "string", "minLength": 1 },
                        "action": { "$ref": "#/$defs/action" }
                    }
                }
            },
            "edges": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["source", "target"],
                    "properties": {
                        "source": { "type": "string", "minLength": 1 },
                        "target": { "type": "string", "minLength": 1 }
                    }
                }
            },
            "context": { "type": "object" }
        },
        "$defs": {
            "action": {
                "type": "object",
                "required": ["type"],
                "properties": {
                    "type": { "type": "string", "minLength": 1 }
                }
            }
        }
    })
}
