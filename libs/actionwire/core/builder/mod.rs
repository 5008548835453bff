//! Type-state client builder
//!
//! The transport URL and the deployment target are required and enforced at
//! compile time; everything else has a sensible default. Configuration
//! consistency (static credentials, target capabilities) is checked in
//! `build()`, before a client ever exists.

pub mod states;

use crate::auth::AuthTransport;
use crate::core::client::Client;
use crate::core::config::ClientConfig;
use crate::policy::DeploymentTarget;
use crate::traits::auth::TokenProvider;
use crate::traits::error::{ClientError, Result};
use crate::traits::reconnect::{NeverReconnect, ReconnectStrategy};
use states::*;
use std::sync::Arc;
use std::time::Duration;

pub struct ClientBuilder<U, T>
where
    U: UrlState,
    T: TargetState,
{
    _state: TypeState<U, T>,
    url: Option<String>,
    target: Option<DeploymentTarget>,
    token_provider: Option<Arc<dyn TokenProvider>>,
    static_credentials: Option<(String, String, String)>,
    auth_transport: Option<AuthTransport>,
    auth_required: Option<bool>,
    strict_validation: bool,
    request_timeout: Option<Duration>,
    connection_timeout: Option<Duration>,
    reconnect: Option<Box<dyn ReconnectStrategy>>,
    buffer_requests: bool,
    tenant_id: Option<String>,
    subprotocol: Option<String>,
}

impl ClientBuilder<NoUrl, NoTarget> {
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            url: None,
            target: None,
            token_provider: None,
            static_credentials: None,
            auth_transport: None,
            auth_required: None,
            strict_validation: false,
            request_timeout: None,
            connection_timeout: None,
            reconnect: None,
            buffer_requests: false,
            tenant_id: None,
            subprotocol: None,
        }
    }
}

impl Default for ClientBuilder<NoUrl, NoTarget> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ClientBuilder<NoUrl, T>
where
    T: TargetState,
{
    /// Set the transport URL (`ws://` or `wss://`)
    pub fn url(self, url: impl Into<String>) -> ClientBuilder<HasUrl, T> {
        ClientBuilder {
            _state: TypeState::new(),
            url: Some(url.into()),
            target: self.target,
            token_provider: self.token_provider,
            static_credentials: self.static_credentials,
            auth_transport: self.auth_transport,
            auth_required: self.auth_required,
            strict_validation: self.strict_validation,
            request_timeout: self.request_timeout,
            connection_timeout: self.connection_timeout,
            reconnect: self.reconnect,
            buffer_requests: self.buffer_requests,
            tenant_id: self.tenant_id,
            subprotocol: self.subprotocol,
        }
    }
}

impl<U> ClientBuilder<U, NoTarget>
where
    U: UrlState,
{
    /// Declare where this client runs; parameterizes the security policy
    /// guard and the validator backend
    pub fn target(self, target: DeploymentTarget) -> ClientBuilder<U, HasTarget> {
        ClientBuilder {
            _state: TypeState::new(),
            url: self.url,
            target: Some(target),
            token_provider: self.token_provider,
            static_credentials: self.static_credentials,
            auth_transport: self.auth_transport,
            auth_required: self.auth_required,
            strict_validation: self.strict_validation,
            request_timeout: self.request_timeout,
            connection_timeout: self.connection_timeout,
            reconnect: self.reconnect,
            buffer_requests: self.buffer_requests,
            tenant_id: self.tenant_id,
            subprotocol: self.subprotocol,
        }
    }
}

impl<U, T> ClientBuilder<U, T>
where
    U: UrlState,
    T: TargetState,
{
    /// Dynamic credential mode: an async callback owns token acquisition
    pub fn token_provider(mut self, provider: impl TokenProvider + 'static) -> Self {
        self.token_provider = Some(Arc::new(provider));
        self
    }

    /// Static credential mode: exchange a client id/secret against the
    /// authentication endpoint (non-sandboxed targets only)
    pub fn static_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        authentication_url: impl Into<String>,
    ) -> Self {
        self.static_credentials =
            Some((client_id.into(), client_secret.into(), authentication_url.into()));
        self
    }

    /// How the resolved credential reaches the server
    pub fn auth_transport(mut self, transport: AuthTransport) -> Self {
        self.auth_transport = Some(transport);
        self
    }

    /// Explicit opt-out from authentication
    pub fn auth_required(mut self, required: bool) -> Self {
        self.auth_required = Some(required);
        self
    }

    /// Enforce schema validation on outbound requests
    pub fn strict_validation(mut self, strict: bool) -> Self {
        self.strict_validation = strict;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = Some(timeout);
        self
    }

    /// Reconnection pacing; defaults to bounded exponential backoff
    pub fn reconnect_strategy(mut self, strategy: impl ReconnectStrategy + 'static) -> Self {
        self.reconnect = Some(Box::new(strategy));
        self
    }

    /// Disable reconnection entirely
    pub fn no_reconnect(mut self) -> Self {
        self.reconnect = Some(Box::new(NeverReconnect));
        self
    }

    /// Let `send` wait for the connection to open instead of refusing
    pub fn buffer_requests(mut self, buffer: bool) -> Self {
        self.buffer_requests = buffer;
        self
    }

    /// Default tenant id stamped on outbound envelopes
    pub fn tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Override the announced subprotocol name
    pub fn subprotocol(mut self, subprotocol: impl Into<String>) -> Self {
        self.subprotocol = Some(subprotocol.into());
        self
    }
}

// Build is only available once URL and target are set.
impl ClientBuilder<HasUrl, HasTarget> {
    pub fn build(self) -> Result<Client> {
        let url = self.url.expect("url state guarantees a value");
        let target = self.target.expect("target state guarantees a value");

        if let Some((_, _, authentication_url)) = &self.static_credentials {
            if !target.capabilities().static_secrets {
                return Err(ClientError::Configuration(
                    "static client secrets are not permitted for sandboxed targets".into(),
                ));
            }
            if authentication_url.is_empty() {
                return Err(ClientError::Configuration(
                    "static credentials require an authentication url".into(),
                ));
            }
        }

        let mut config = ClientConfig::new(url, target);
        if let Some(provider) = self.token_provider {
            config.set_token_provider(provider);
        }
        if let Some((id, secret, auth_url)) = self.static_credentials {
            config.set_static_credentials(id, secret, auth_url);
        }
        if let Some(transport) = self.auth_transport {
            config.set_auth_transport(transport);
        }
        if let Some(required) = self.auth_required {
            config.set_auth_required(required);
        }
        config.set_strict_validation(self.strict_validation);
        if let Some(timeout) = self.request_timeout {
            config.set_request_timeout(timeout);
        }
        if let Some(timeout) = self.connection_timeout {
            config.set_connection_timeout(timeout);
        }
        if let Some(strategy) = self.reconnect {
            config.set_reconnect(strategy);
        }
        config.set_buffer_requests(self.buffer_requests);
        if let Some(tenant_id) = self.tenant_id {
            config.set_tenant_id(tenant_id);
        }
        if let Some(subprotocol) = self.subprotocol {
            config.set_subprotocol(subprotocol);
        }

        Ok(Client::from_config(config))
    }
}
