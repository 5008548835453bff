//! Client configuration
//!
//! Assembled by the builder, immutable once the client exists. The
//! deployment target is part of construction rather than something the
//! runtime infers from its environment.

use crate::auth::AuthTransport;
use crate::policy::DeploymentTarget;
use crate::traits::auth::TokenProvider;
use crate::traits::reconnect::{ExponentialBackoff, ReconnectStrategy};
use std::sync::Arc;
use std::time::Duration;

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Default transport-open timeout
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);
/// Subprotocol announced on every handshake
pub const DEFAULT_SUBPROTOCOL: &str = "envelope.v1";

pub struct ClientConfig {
    transport_url: String,
    deployment_target: DeploymentTarget,
    token_provider: Option<Arc<dyn TokenProvider>>,
    client_id: Option<String>,
    client_secret: Option<String>,
    authentication_url: Option<String>,
    auth_transport: AuthTransport,
    auth_required: bool,
    strict_validation: bool,
    request_timeout: Duration,
    connection_timeout: Duration,
    reconnect: Box<dyn ReconnectStrategy>,
    buffer_requests: bool,
    tenant_id: Option<String>,
    subprotocol: String,
}

impl ClientConfig {
    pub fn new(transport_url: String, deployment_target: DeploymentTarget) -> Self {
        Self {
            transport_url,
            deployment_target,
            token_provider: None,
            client_id: None,
            client_secret: None,
            authentication_url: None,
            auth_transport: AuthTransport::default(),
            auth_required: true,
            strict_validation: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            reconnect: Box::new(ExponentialBackoff::new(
                Duration::from_secs(1),
                Duration::from_secs(60),
                Some(10),
            )),
            buffer_requests: false,
            tenant_id: None,
            subprotocol: DEFAULT_SUBPROTOCOL.to_string(),
        }
    }

    pub fn transport_url(&self) -> &str {
        &self.transport_url
    }

    pub fn deployment_target(&self) -> DeploymentTarget {
        self.deployment_target
    }

    pub fn token_provider(&self) -> Option<Arc<dyn TokenProvider>> {
        self.token_provider.as_ref().map(Arc::clone)
    }

    pub fn has_token_provider(&self) -> bool {
        self.token_provider.is_some()
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref()
    }

    pub fn has_static_credentials(&self) -> bool {
        self.client_id.is_some() || self.client_secret.is_some()
    }

    pub fn authentication_url(&self) -> Option<&str> {
        self.authentication_url.as_deref()
    }

    pub fn auth_transport(&self) -> AuthTransport {
        self.auth_transport
    }

    pub fn auth_required(&self) -> bool {
        self.auth_required
    }

    pub fn strict_validation(&self) -> bool {
        self.strict_validation
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }

    pub fn reconnect(&self) -> &dyn ReconnectStrategy {
        self.reconnect.as_ref()
    }

    pub fn buffer_requests(&self) -> bool {
        self.buffer_requests
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    pub fn subprotocol(&self) -> &str {
        &self.subprotocol
    }

    // Builder-side mutators; the config is frozen once the client owns it.

    pub(crate) fn set_token_provider(&mut self, provider: Arc<dyn TokenProvider>) {
        self.token_provider = Some(provider);
    }

    pub(crate) fn set_static_credentials(&mut self, client_id: String, client_secret: String, authentication_url: String) {
        self.client_id = Some(client_id);
        self.client_secret = Some(client_secret);
        self.authentication_url = Some(authentication_url);
    }

    pub(crate) fn set_auth_transport(&mut self, transport: AuthTransport) {
        self.auth_transport = transport;
    }

    pub(crate) fn set_auth_required(&mut self, required: bool) {
        self.auth_required = required;
    }

    pub(crate) fn set_strict_validation(&mut self, strict: bool) {
        self.strict_validation = strict;
    }

    pub(crate) fn set_request_timeout(&mut self, timeout: Duration) {
        self.request_timeout = timeout;
    }

    pub(crate) fn set_connection_timeout(&mut self, timeout: Duration) {
        self.connection_timeout = timeout;
    }

    pub(crate) fn set_reconnect(&mut self, strategy: Box<dyn ReconnectStrategy>) {
        self.reconnect = strategy;
    }

    pub(crate) fn set_buffer_requests(&mut self, buffer: bool) {
        self.buffer_requests = buffer;
    }

    pub(crate) fn set_tenant_id(&mut self, tenant_id: String) {
        self.tenant_id = Some(tenant_id);
    }

    pub(crate) fn set_subprotocol(&mut self, subprotocol: String) {
        self.subprotocol = subprotocol;
    }
}

/// Per-request overrides for [`crate::Client::send`]
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Overrides the client-wide request timeout
    pub timeout: Option<Duration>,
    /// Caller-supplied correlation id (must be unique among in-flight
    /// requests); needed to `cancel` a request later
    pub correlation_id: Option<String>,
    /// Overrides the generated idempotency key (retried business operations)
    pub idempotency_key: Option<String>,
    /// Overrides the client-wide tenant id
    pub tenant_id: Option<String>,
    /// Attached verbatim for distributed tracing
    pub trace_id: Option<String>,
}

impl SendOptions {
    pub fn timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::default()
        }
    }
}
