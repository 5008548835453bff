//! Precompiled validator backend
//!
//! Side-effect-free check functions, one per registered schema, for
//! deployment targets where runtime schema interpretation is off the table.
//! Each function mirrors its registry document; the conformance suite in
//! `validate/mod.rs` holds the two backends to identical accept/reject
//! decisions.

use crate::traits::validator::{ErrorDetail, SchemaValidator, Validation};
use serde_json::{Map, Value};

pub struct PrecompiledValidator;

impl PrecompiledValidator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PrecompiledValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaValidator for PrecompiledValidator {
    fn validate(&self, schema: &str, data: &Value) -> Validation {
        let mut errors = Vec::new();

        match schema {
            "interaction" => check_interaction(data, &mut errors),
            "elevate" => check_elevate(data, &mut errors),
            "translate" => check_translate(data, &mut errors),
            "insights" => check_insights(data, &mut errors),
            "interaction.response" | "elevate.response" | "translate.response"
            | "insights.response" => {
                object_at(data, "$", &mut errors);
            }
            // Advisory registry: unknown names validate as accepted.
            _ => {}
        }

        if errors.is_empty() {
            Validation::ok()
        } else {
            Validation::failed(errors)
        }
    }

    fn backend(&self) -> &'static str {
        "precompiled"
    }
}

fn type_error(path: &str, expected: &str, errors: &mut Vec<ErrorDetail>) {
    errors.push(ErrorDetail::new(path, "type", format!("expected {expected}")));
}

fn required_error(path: &str, name: &str, errors: &mut Vec<ErrorDetail>) {
    errors.push(ErrorDetail::new(
        format!("{path}.{name}"),
        "required",
        format!("missing required field '{name}'"),
    ));
}

/// Object type gate; a mistyped node is not inspected further
fn object_at<'a>(data: &'a Value, path: &str, errors: &mut Vec<ErrorDetail>) -> Option<&'a Map<String, Value>> {
    match data.as_object() {
        Some(fields) => Some(fields),
        None => {
            type_error(path, "object", errors);
            None
        }
    }
}

fn string_at(data: &Value, path: &str, min_length: u64, errors: &mut Vec<ErrorDetail>) {
    let Some(s) = data.as_str() else {
        type_error(path, "string", errors);
        return;
    };
    if (s.chars().count() as u64) < min_length {
        errors.push(ErrorDetail::new(
            path,
            "minLength",
            format!("shorter than {min_length} character(s)"),
        ));
    }
}

fn check_session(data: &Value, errors: &mut Vec<ErrorDetail>) {
    let Some(session) = object_at(data, "$.session", errors) else {
        return;
    };
    if !session.contains_key("id") {
        required_error("$.session", "id", errors);
    }
    if let Some(id) = session.get("id") {
        string_at(id, "$.session.id", 1, errors);
    }
}

fn check_interaction(data: &Value, errors: &mut Vec<ErrorDetail>) {
    let Some(root) = object_at(data, "$", errors) else {
        return;
    };

    for name in ["session", "request"] {
        if !root.contains_key(name) {
            required_error("$", name, errors);
        }
    }

    if let Some(session) = root.get("session") {
        check_session(session, errors);
    }

    if let Some(request) = root.get("request") {
        if let Some(request) = object_at(request, "$.request", errors) {
            if !request.contains_key("input") {
                required_error("$.request", "input", errors);
            }
            if let Some(input) = request.get("input") {
                string_at(input, "$.request.input", 1, errors);
            }
            if let Some(variant) = request.get("variant") {
                match variant.as_str() {
                    None => type_error("$.request.variant", "string", errors),
                    Some(v) if !matches!(v, "A" | "B" | "C") => {
                        errors.push(ErrorDetail::new(
                            "$.request.variant",
                            "enum",
                            "value not in allowed set",
                        ));
                    }
                    Some(_) => {}
                }
            }
        }
    }

    if let Some(scope) = root.get("scope") {
        object_at(scope, "$.scope", errors);
    }
}

fn check_elevate(data: &Value, errors: &mut Vec<ErrorDetail>) {
    let Some(root) = object_at(data, "$", errors) else {
        return;
    };

    for name in ["session", "request"] {
        if !root.contains_key(name) {
            required_error("$", name, errors);
        }
    }

    if let Some(session) = root.get("session") {
        check_session(session, errors);
    }

    if let Some(request) = root.get("request") {
        if let Some(request) = object_at(request, "$.request", errors) {
            if !request.contains_key("level") {
                required_error("$.request", "level", errors);
            }
            if let Some(level) = request.get("level") {
                if !(level.is_i64() || level.is_u64()) {
                    type_error("$.request.level", "integer", errors);
                }
            }
        }
    }
}

fn check_translate(data: &Value, errors: &mut Vec<ErrorDetail>) {
    let Some(root) = object_at(data, "$", errors) else {
        return;
    };

    if !root.contains_key("request") {
        required_error("$", "request", errors);
    }

    if let Some(request) = root.get("request") {
        if let Some(request) = object_at(request, "$.request", errors) {
            for name in ["text", "targetLanguage"] {
                if !request.contains_key(name) {
                    required_error("$.request", name, errors);
                }
            }
            if let Some(text) = request.get("text") {
                string_at(text, "$.request.text", 1, errors);
            }
            if let Some(target) = request.get("targetLanguage") {
                string_at(target, "$.request.targetLanguage", 2, errors);
            }
        }
    }
}

fn check_insights(data: &Value, errors: &mut Vec<ErrorDetail>) {
    let Some(root) = object_at(data, "$", errors) else {
        return;
    };

    if !root.contains_key("session") {
        required_error("$", "session", errors);
    }

    if let Some(session) = root.get("session") {
        check_session(session, errors);
    }

    if let Some(scope) = root.get("scope") {
        if let Some(scope) = object_at(scope, "$.scope", errors) {
            if let Some(window) = scope.get("window") {
                if !window.is_number() {
                    type_error("$.scope.window", "number", errors);
                }
            }
        }
    }
}
