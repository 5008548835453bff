//! Security policy guard
//!
//! Pure checks enforcing scheme and credential-exposure invariants per
//! deployment target. This is a security boundary, not a convenience check:
//! it runs before every connection attempt, including each reconnect cycle,
//! and a violation aborts the attempt before any network activity.

use crate::core::config::ClientConfig;
use crate::traits::error::{ClientError, Result};

/// Configuration-time classification of where the client runs
///
/// Injected at construction and immutable for the lifetime of a client
/// instance; nothing in the runtime probes its environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentTarget {
    /// Trusted server process, unrestricted
    Server,
    /// Server process shipped as a restricted bundle (no script evaluation)
    ServerRestricted,
    /// Browser-embedded, CSP-constrained sandbox
    BrowserSandbox,
}

/// Capability set derived from a [`DeploymentTarget`]
///
/// Replaces per-artifact build flags with one explicit value consumed by the
/// policy guard and the validator factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Runtime schema interpretation is acceptable (full validator backend)
    pub script_eval: bool,
    /// Static client secrets may be held in process memory
    pub static_secrets: bool,
    /// Only the secure transport scheme is acceptable
    pub secure_transport_only: bool,
}

impl DeploymentTarget {
    pub fn capabilities(self) -> Capabilities {
        match self {
            DeploymentTarget::Server => Capabilities {
                script_eval: true,
                static_secrets: true,
                secure_transport_only: false,
            },
            DeploymentTarget::ServerRestricted => Capabilities {
                script_eval: false,
                static_secrets: true,
                secure_transport_only: false,
            },
            DeploymentTarget::BrowserSandbox => Capabilities {
                script_eval: false,
                static_secrets: false,
                secure_transport_only: true,
            },
        }
    }

    pub fn is_sandboxed(self) -> bool {
        matches!(self, DeploymentTarget::BrowserSandbox)
    }
}

/// Enforce transport-scheme and credential-exposure policy
///
/// - `InsecureScheme` when the target only accepts the secure scheme and the
///   URL uses `ws://`
/// - `MissingCredentialSource` when a sandboxed target connects securely but
///   has neither a dynamic token provider nor an explicit auth opt-out
///
/// An empty URL is a no-op; the subsequent connect attempt fails on its own
/// terms.
pub fn enforce(transport_url: &str, target: DeploymentTarget, config: &ClientConfig) -> Result<()> {
    if transport_url.is_empty() {
        return Ok(());
    }

    let capabilities = target.capabilities();

    if capabilities.secure_transport_only && transport_url.starts_with("ws://") {
        return Err(ClientError::InsecureScheme {
            url: transport_url.to_string(),
        });
    }

    if target.is_sandboxed() && !config.has_token_provider() && config.auth_required() {
        return Err(ClientError::MissingCredentialSource);
    }

    Ok(())
}
