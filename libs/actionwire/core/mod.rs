//! Client core: lifecycle manager, correlator, configuration and builder

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;
pub mod correlator;

pub use builder::{states, ClientBuilder};
pub use client::Client;
pub use config::{ClientConfig, SendOptions};
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, Metrics};
