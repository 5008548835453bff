use crate::traits::validator::ErrorDetail;
use thiserror::Error;

/// Main error type for actionwire
///
/// Every variant carries a stable machine-readable code (see [`ClientError::code`])
/// in addition to its human-readable message. Per-request variants only ever
/// reject the request that triggered them; connection-level variants are also
/// emitted on the event bus.
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    /// Insecure transport scheme rejected for a sandboxed target
    #[error("insecure transport scheme for sandboxed target: {url}")]
    InsecureScheme { url: String },

    /// Sandboxed target has no usable credential source
    #[error("sandboxed target requires a token provider or an explicit auth opt-out")]
    MissingCredentialSource,

    /// Credential could not be resolved for a connection attempt
    #[error("credential acquisition failed: {0}")]
    CredentialAcquisition(String),

    /// Transport dropped while the client was open
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// Connection is closed (or was closed gracefully while requests were outstanding)
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// No response arrived within the per-request timeout
    #[error("request '{action}' timed out after {timeout_ms}ms")]
    RequestTimeout { action: String, timeout_ms: u64 },

    /// Caller cancelled an in-flight request
    #[error("request {correlation_id} was cancelled")]
    RequestCancelled { correlation_id: String },

    /// Payload failed schema validation in strict mode
    #[error("schema validation failed for '{schema}' ({} error(s))", .errors.len())]
    Validation {
        schema: String,
        errors: Vec<ErrorDetail>,
    },

    /// Structurally malformed inbound frame
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Caller handed a payload that is not a structured record
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Underlying WebSocket transport error
    #[error("transport error: {0}")]
    Transport(String),

    /// Invalid or inconsistent client configuration
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::InsecureScheme { .. } => "EC_INSECURE_SCHEME",
            ClientError::MissingCredentialSource => "EC_MISSING_CREDENTIAL_SOURCE",
            ClientError::CredentialAcquisition(_) => "EC_CREDENTIAL_ACQUISITION",
            ClientError::ConnectionLost(_) => "EC_CONNECTION_LOST",
            ClientError::ConnectionClosed(_) => "EC_CONNECTION_CLOSED",
            ClientError::RequestTimeout { .. } => "EC_REQUEST_TIMEOUT",
            ClientError::RequestCancelled { .. } => "EC_REQUEST_CANCELLED",
            ClientError::Validation { .. } => "EC_VALIDATION",
            ClientError::Protocol(_) => "EC_PROTOCOL",
            ClientError::MalformedPayload(_) => "EC_MALFORMED_PAYLOAD",
            ClientError::Transport(_) => "EC_TRANSPORT",
            ClientError::Configuration(_) => "EC_CONFIGURATION",
        }
    }

    /// Whether the error terminates the client instance rather than a single
    /// request or connection cycle
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ClientError::InsecureScheme { .. }
                | ClientError::MissingCredentialSource
                | ClientError::CredentialAcquisition(_)
                | ClientError::Configuration(_)
        )
    }
}

/// Result type for actionwire operations
pub type Result<T> = std::result::Result<T, ClientError>;
