//! Full validator backend
//!
//! Interprets the registry's schema documents at validation time. This is
//! the preferred backend wherever runtime schema interpretation is
//! acceptable; CSP-constrained targets use the precompiled backend instead.

use crate::traits::validator::{ErrorDetail, SchemaValidator, Validation};
use crate::validate::schemas;
use serde_json::Value;
use std::collections::HashMap;

pub struct FullValidator {
    documents: HashMap<&'static str, Value>,
}

impl FullValidator {
    pub fn new() -> Self {
        Self {
            documents: schemas::documents().into_iter().collect(),
        }
    }
}

impl Default for FullValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaValidator for FullValidator {
    fn validate(&self, schema: &str, data: &Value) -> Validation {
        let Some(document) = self.documents.get(schema) else {
            // Advisory registry: unknown names validate as accepted.
            return Validation::ok();
        };

        let mut errors = Vec::new();
        check_node(document, data, "$", &mut errors);

        if errors.is_empty() {
            Validation::ok()
        } else {
            Validation::failed(errors)
        }
    }

    fn backend(&self) -> &'static str {
        "full"
    }
}

fn type_matches(expected: &str, data: &Value) -> bool {
    match expected {
        "object" => data.is_object(),
        "array" => data.is_array(),
        "string" => data.is_string(),
        "number" => data.is_number(),
        "integer" => data.is_i64() || data.is_u64(),
        "boolean" => data.is_boolean(),
        "null" => data.is_null(),
        _ => true,
    }
}

fn check_node(schema: &Value, data: &Value, path: &str, errors: &mut Vec<ErrorDetail>) {
    if let Some(expected) = schema.get("type").and_then(Value::as_str) {
        if !type_matches(expected, data) {
            errors.push(ErrorDetail::new(
                path,
                "type",
                format!("expected {expected}"),
            ));
            // A mistyped node is not inspected further.
            return;
        }
    }

    if let Some(fields) = data.as_object() {
        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for name in required.iter().filter_map(Value::as_str) {
                if !fields.contains_key(name) {
                    errors.push(ErrorDetail::new(
                        format!("{path}.{name}"),
                        "required",
                        format!("missing required field '{name}'"),
                    ));
                }
            }
        }

        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (name, subschema) in properties {
                if let Some(child) = fields.get(name) {
                    check_node(subschema, child, &format!("{path}.{name}"), errors);
                }
            }
        }
    }

    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.contains(data) {
            errors.push(ErrorDetail::new(path, "enum", "value not in allowed set"));
        }
    }

    if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
        if let Some(s) = data.as_str() {
            if (s.chars().count() as u64) < min {
                errors.push(ErrorDetail::new(
                    path,
                    "minLength",
                    format!("shorter than {min} character(s)"),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reports_paths_for_nested_failures() {
        let validator = FullValidator::new();
        let result = validator.validate(
            "interaction",
            &json!({"session": {"id": ""}, "request": {"input": "hi", "variant": "Z"}}),
        );

        assert!(!result.valid);
        let errors = result.into_errors();
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"$.session.id"));
        assert!(paths.contains(&"$.request.variant"));
    }

    #[test]
    fn mistyped_node_is_not_descended() {
        let validator = FullValidator::new();
        let result = validator.validate("interaction", &json!({"session": "nope", "request": {"input": "x"}}));

        let errors = result.into_errors();
        // One type error at $.session, no phantom `required` error below it.
        assert_eq!(errors.iter().filter(|e| e.path.starts_with("$.session")).count(), 1);
        assert_eq!(errors[0].code, "type");
    }

    #[test]
    fn unknown_schema_is_accepted() {
        let validator = FullValidator::new();
        assert!(validator.validate("unregistered", &json!(42)).valid);
    }
}
