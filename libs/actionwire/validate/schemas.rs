//! Schema registry shared by both validator backends
//!
//! Documents use a small JSON-Schema subset: `type`, `required`,
//! `properties`, `enum`, `minLength`. The full backend interprets these
//! documents at validation time; the precompiled backend mirrors them as
//! hand-compiled check functions. Request schemas are keyed by action name,
//! response schemas by `<action>.response`.

use serde_json::{json, Value};

/// Actions with registered request schemas
pub const ACTIONS: [&str; 4] = ["interaction", "elevate", "translate", "insights"];

fn session() -> Value {
    json!({
        "type": "object",
        "required": ["id"],
        "properties": {
            "id": { "type": "string", "minLength": 1 }
        }
    })
}

/// All registered schema documents, keyed by schema name
pub fn documents() -> Vec<(&'static str, Value)> {
    let mut docs = vec![
        (
            "interaction",
            json!({
                "type": "object",
                "required": ["session", "request"],
                "properties": {
                    "session": session(),
                    "request": {
                        "type": "object",
                        "required": ["input"],
                        "properties": {
                            "input": { "type": "string", "minLength": 1 },
                            "variant": { "type": "string", "enum": ["A", "B", "C"] }
                        }
                    },
                    "scope": { "type": "object" }
                }
            }),
        ),
        (
            "elevate",
            json!({
                "type": "object",
                "required": ["session", "request"],
                "properties": {
                    "session": session(),
                    "request": {
                        "type": "object",
                        "required": ["level"],
                        "properties": {
                            "level": { "type": "integer" }
                        }
                    }
                }
            }),
        ),
        (
            "translate",
            json!({
                "type": "object",
                "required": ["request"],
                "properties": {
                    "request": {
                        "type": "object",
                        "required": ["text", "targetLanguage"],
                        "properties": {
                            "text": { "type": "string", "minLength": 1 },
                            "targetLanguage": { "type": "string", "minLength": 2 }
                        }
                    }
                }
            }),
        ),
        (
            "insights",
            json!({
                "type": "object",
                "required": ["session"],
                "properties": {
                    "session": session(),
                    "scope": {
                        "type": "object",
                        "properties": {
                            "window": { "type": "number" }
                        }
                    }
                }
            }),
        ),
    ];

    // Response payloads are only constrained structurally.
    docs.push(("interaction.response", json!({ "type": "object" })));
    docs.push(("elevate.response", json!({ "type": "object" })));
    docs.push(("translate.response", json!({ "type": "object" })));
    docs.push(("insights.response", json!({ "type": "object" })));

    docs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_action_has_request_and_response_schemas() {
        let docs = documents();
        for action in ACTIONS {
            assert!(docs.iter().any(|(name, _)| *name == action));
            let response = format!("{action}.response");
            assert!(docs.iter().any(|(name, _)| *name == response));
        }
    }
}
