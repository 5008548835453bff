//! # Actionwire traits
//!
//! Cross-cutting abstractions used throughout the client:
//!
//! - **TokenProvider**: caller-supplied dynamic credential acquisition
//! - **ReconnectStrategy**: reconnection pacing policies
//! - **SchemaValidator**: uniform validation contract over interchangeable backends
//! - **EventBus / ClientEvent**: typed publish/subscribe event surface
//! - **ClientError**: the full error taxonomy with stable machine codes

pub mod auth;
pub mod error;
pub mod events;
pub mod reconnect;
pub mod validator;

// Re-export commonly used types
pub use auth::{StaticToken, TokenProvider};
pub use error::{ClientError, Result};
pub use events::{ClientEvent, EventBus};
pub use reconnect::{ExponentialBackoff, FixedDelay, NeverReconnect, ReconnectStrategy};
pub use validator::{ErrorDetail, SchemaValidator, Validation};
