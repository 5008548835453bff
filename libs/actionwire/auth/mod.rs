//! Authentication provider
//!
//! Resolves a usable credential for exactly one connection attempt, either
//! by invoking a caller-supplied [`TokenProvider`] (dynamic mode) or by
//! exchanging a client id/secret against the authentication endpoint
//! (static mode, non-sandboxed targets only). How the credential reaches
//! the server is a separate configuration choice ([`AuthTransport`]), not
//! decided here.

use crate::core::config::ClientConfig;
use crate::traits::auth::TokenProvider;
use crate::traits::error::{ClientError, Result};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// How the resolved credential is delivered to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthTransport {
    /// Appended to the WebSocket handshake as a `bearer.<token>` subprotocol
    #[default]
    Subprotocol,
    /// Sent as an `authenticate` envelope, first frame after the transport opens
    Handshake,
}

/// How a credential was acquired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialMethod {
    StaticExchange,
    DynamicProvider,
}

/// Short-lived authentication artifact
///
/// Never persisted; re-resolved on every (re)connection attempt so that
/// short-lived tokens stay usable across reconnect cycles.
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub method: CredentialMethod,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

/// Credential resolution engine, one per client
pub(crate) struct AuthProvider {
    http: reqwest::Client,
    token_provider: Option<Arc<dyn TokenProvider>>,
    client_id: Option<String>,
    client_secret: Option<String>,
    authentication_url: Option<String>,
    auth_required: bool,
}

impl AuthProvider {
    pub(crate) fn from_config(config: &ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_provider: config.token_provider(),
            client_id: config.client_id().map(str::to_string),
            client_secret: config.client_secret().map(str::to_string),
            authentication_url: config.authentication_url().map(str::to_string),
            auth_required: config.auth_required(),
        }
    }

    /// Resolve a credential for one connection attempt
    ///
    /// `Ok(None)` means the client connects unauthenticated, which requires
    /// the explicit `auth_required = false` opt-out.
    pub(crate) async fn resolve(&self) -> Result<Option<Credential>> {
        if let Some(provider) = &self.token_provider {
            let token = provider
                .acquire()
                .await
                .map_err(|e| ClientError::CredentialAcquisition(e.to_string()))?;
            debug!("credential resolved via token provider");
            return Ok(Some(Credential {
                token,
                method: CredentialMethod::DynamicProvider,
            }));
        }

        if let (Some(id), Some(secret), Some(url)) =
            (&self.client_id, &self.client_secret, &self.authentication_url)
        {
            let token = self.exchange(id, secret, url).await?;
            debug!("credential resolved via static exchange");
            return Ok(Some(Credential {
                token,
                method: CredentialMethod::StaticExchange,
            }));
        }

        if !self.auth_required {
            return Ok(None);
        }

        Err(ClientError::CredentialAcquisition(
            "no credential source configured".into(),
        ))
    }

    /// The credential a caller gets from `Client::authenticate`
    pub(crate) async fn authenticate(&self) -> Result<Credential> {
        self.resolve().await?.ok_or_else(|| {
            ClientError::CredentialAcquisition("no credential source configured".into())
        })
    }

    /// Static mode: client id/secret in, bearer token out
    async fn exchange(&self, client_id: &str, client_secret: &str, url: &str) -> Result<String> {
        let response = self
            .http
            .post(url)
            .json(&json!({ "clientId": client_id, "clientSecret": client_secret }))
            .send()
            .await
            .map_err(|e| ClientError::CredentialAcquisition(format!("exchange request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::CredentialAcquisition(format!(
                "authentication endpoint returned {status}"
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ClientError::CredentialAcquisition(format!("unusable token response: {e}")))?;

        if body.token.is_empty() {
            return Err(ClientError::CredentialAcquisition(
                "authentication endpoint returned an empty token".into(),
            ));
        }

        Ok(body.token)
    }
}
