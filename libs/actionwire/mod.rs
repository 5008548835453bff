//! # Actionwire
//!
//! A client runtime for a bidirectional, envelope-based action protocol
//! carried over a persistent WebSocket transport.
//!
//! ## Features
//!
//! - **Promise-style requests**: `send` returns the correlated response;
//!   concurrent requests are independent and individually cancellable
//! - **Deployment-target aware**: an injected target drives the security
//!   policy guard and validator backend selection; no environment probing
//! - **Pluggable auth**: static id/secret exchange or a caller-supplied
//!   async token provider, delivered via subprotocol or handshake frame
//! - **Resilient lifecycle**: reconnection with configurable backoff,
//!   graceful close, typed lifecycle events
//!
//! ## Example
//!
//! ```rust,ignore
//! use actionwire::{ClientBuilder, DeploymentTarget, StaticToken};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> actionwire::Result<()> {
//!     let client = ClientBuilder::new()
//!         .url("wss://actions.example.com/v1")
//!         .target(DeploymentTarget::Server)
//!         .token_provider(StaticToken(std::env::var("ACTION_TOKEN").unwrap()))
//!         .strict_validation(true)
//!         .build()?;
//!
//!     client.open().await?;
//!
//!     let response = client
//!         .interaction(json!({
//!             "session": { "id": "sess-42" },
//!             "request": { "input": "hello" }
//!         }))
//!         .await?;
//!     println!("{}", response.payload);
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod codec;
pub mod core;
pub mod policy;
pub mod traits;
pub mod validate;

// Re-export all traits
pub use traits::*;

// Re-export the client surface
pub use crate::core::{
    builder::ClientBuilder,
    client::Client,
    config::{ClientConfig, SendOptions},
    connection_state::{ConnectionState, Metrics},
};

// Re-export protocol types
pub use auth::{AuthTransport, Credential, CredentialMethod};
pub use codec::{Envelope, EnvelopeHeaders};
pub use policy::{Capabilities, DeploymentTarget};

/// Create a new client builder
pub fn builder(
) -> ClientBuilder<crate::core::builder::states::NoUrl, crate::core::builder::states::NoTarget> {
    ClientBuilder::new()
}
