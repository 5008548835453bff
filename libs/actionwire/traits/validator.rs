use serde_json::Value;

/// One field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    /// JSON path of the offending value, rooted at the payload (`$`)
    pub path: String,
    /// Short rule identifier (`type`, `required`, `enum`, `minLength`)
    pub code: String,
    /// Human-readable description
    pub message: String,
}

impl ErrorDetail {
    pub fn new(path: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Outcome of validating a payload against a named schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    /// Populated only when `valid` is false
    pub errors: Option<Vec<ErrorDetail>>,
}

impl Validation {
    pub fn ok() -> Self {
        Self { valid: true, errors: None }
    }

    pub fn failed(errors: Vec<ErrorDetail>) -> Self {
        Self { valid: false, errors: Some(errors) }
    }

    pub fn into_errors(self) -> Vec<ErrorDetail> {
        self.errors.unwrap_or_default()
    }
}

/// Uniform validation contract over interchangeable backends
///
/// Implementations must agree on accept/reject for every (schema, input)
/// pair; only performance and code-size characteristics may differ. A schema
/// name that no backend knows validates as accepted: the registry is
/// advisory, enforcement is the caller's strict-mode decision.
pub trait SchemaValidator: Send + Sync {
    /// Validate `data` against the schema registered under `schema`
    fn validate(&self, schema: &str, data: &Value) -> Validation;

    /// Backend name, for diagnostics
    fn backend(&self) -> &'static str;
}
