use crate::traits::error::Result;
use async_trait::async_trait;

/// Trait for supplying short-lived bearer tokens
///
/// This is the dynamic credential mode: the caller owns token acquisition
/// (refresh, caching policy, vault access) and the client invokes it before
/// every connection attempt. A failure is surfaced to the caller as
/// `CredentialAcquisition` and ends the attempt.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Produce a token usable for exactly one connection attempt
    ///
    /// Called on every connect and reconnect; returned tokens are never
    /// cached past the attempt they were resolved for, so short-lived
    /// tokens are safe.
    async fn acquire(&self) -> Result<String>;
}

/// Token provider returning a fixed token
///
/// Mainly useful in tests and short-lived tooling where the token outlives
/// the process anyway.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn acquire(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}
