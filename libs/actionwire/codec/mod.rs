//! Wire envelope codec
//!
//! Every frame on the transport is a JSON envelope: a `headers` record
//! carrying the action name, correlation id, idempotency key and timestamp,
//! plus an action-specific `payload` object. Encoding assigns fresh ids and
//! applies the field-normalization rules; decoding only ever fails on
//! structural violations, never on business-level payload content.

use crate::traits::error::{ClientError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Envelope headers
///
/// `action`, `correlationId`, `idempotencyKey` and `timestamp` are always
/// present on outbound envelopes. Inbound envelopes are only required to
/// carry `action`; unsolicited pushes legitimately omit `correlationId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeHeaders {
    pub action: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,

    /// Epoch milliseconds at encode time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// Wire unit exchanged over the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub headers: EnvelopeHeaders,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    /// Correlation id, when present
    pub fn correlation_id(&self) -> Option<&str> {
        self.headers.correlation_id.as_deref()
    }

    pub fn action(&self) -> &str {
        &self.headers.action
    }

    /// Serialize to a text frame
    pub fn to_frame(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| ClientError::MalformedPayload(format!("envelope not serializable: {e}")))
    }
}

/// Build an outbound envelope for `action`
///
/// Assigns a fresh correlation id and idempotency key, stamps the current
/// timestamp and normalizes the payload. Fails with `MalformedPayload` when
/// the payload is not a JSON object.
pub fn encode(action: &str, payload: Value) -> Result<Envelope> {
    let Value::Object(mut fields) = payload else {
        return Err(ClientError::MalformedPayload(format!(
            "action '{action}' payload must be a JSON object"
        )));
    };

    normalize(&mut fields);

    Ok(Envelope {
        headers: EnvelopeHeaders {
            action: action.to_string(),
            correlation_id: Some(Uuid::new_v4().to_string()),
            idempotency_key: Some(Uuid::new_v4().to_string()),
            timestamp: Some(Utc::now().timestamp_millis()),
            tenant_id: None,
            trace_id: None,
        },
        payload: Value::Object(fields),
    })
}

/// Parse an inbound text frame into an [`Envelope`]
///
/// Fails with `Protocol` when the frame is not valid JSON, is not an object,
/// or its headers are missing the action field.
pub fn decode(frame: &str) -> Result<Envelope> {
    let value: Value = serde_json::from_str(frame)
        .map_err(|e| ClientError::Protocol(format!("frame is not parseable JSON: {e}")))?;

    if !value.is_object() {
        return Err(ClientError::Protocol("frame is not a JSON object".into()));
    }

    let headers = value
        .get("headers")
        .ok_or_else(|| ClientError::Protocol("frame has no headers".into()))?;

    let action_ok = headers
        .get("action")
        .and_then(Value::as_str)
        .is_some_and(|a| !a.is_empty());
    if !action_ok {
        return Err(ClientError::Protocol("headers are missing the action field".into()));
    }

    serde_json::from_value(value)
        .map_err(|e| ClientError::Protocol(format!("malformed envelope headers: {e}")))
}

/// Payload normalization rules
///
/// - the deprecated top-level `context` field is renamed to `scope` and
///   removed; an existing `scope` value wins
/// - a legacy single-letter lowercase `request.variant` code is upper-cased
fn normalize(fields: &mut Map<String, Value>) {
    if let Some(context) = fields.remove("context") {
        fields.entry("scope".to_string()).or_insert(context);
    }

    if let Some(Value::Object(request)) = fields.get_mut("request") {
        if let Some(Value::String(variant)) = request.get_mut("variant") {
            if variant.len() == 1 && variant.as_bytes()[0].is_ascii_lowercase() {
                variant.make_ascii_uppercase();
            }
        }
    }
}
