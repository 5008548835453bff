//! Connection state machine primitives
//!
//! The state value is the single shared gate every component reads before
//! acting: the correlator refuses to send while not `Open`, the lifecycle
//! task is the only writer. It is stored twice in lockstep, an atomic for
//! cheap synchronous reads plus a watch channel so async callers can await
//! transitions (request buffering, shutdown observation).

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use tokio::sync::watch;

/// Transport status of a client instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Initial and post-close resting state
    Disconnected,
    /// Resolving a credential for the next connection attempt
    Authenticating,
    /// Transport handshake in progress
    Connecting,
    /// Requests are eligible to send
    Open,
    /// Graceful close in progress
    Closing,
    /// Waiting out a backoff delay before the next attempt
    Reconnecting,
    /// Terminal until the caller explicitly opens again
    Failed,
}

impl ConnectionState {
    fn from_u8(value: u8) -> ConnectionState {
        match value {
            1 => ConnectionState::Authenticating,
            2 => ConnectionState::Connecting,
            3 => ConnectionState::Open,
            4 => ConnectionState::Closing,
            5 => ConnectionState::Reconnecting,
            6 => ConnectionState::Failed,
            _ => ConnectionState::Disconnected,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Authenticating => 1,
            ConnectionState::Connecting => 2,
            ConnectionState::Open => 3,
            ConnectionState::Closing => 4,
            ConnectionState::Reconnecting => 5,
            ConnectionState::Failed => 6,
        }
    }

    /// States from which `open()` may start a new connection cycle
    pub fn can_open(self) -> bool {
        matches!(self, ConnectionState::Disconnected | ConnectionState::Failed)
    }

    /// States a buffered request may wait through
    pub fn is_pending_open(self) -> bool {
        matches!(
            self,
            ConnectionState::Authenticating | ConnectionState::Connecting | ConnectionState::Reconnecting
        )
    }
}

/// Lock-free connection state holder
pub struct AtomicConnectionState {
    value: AtomicU8,
}

impl AtomicConnectionState {
    pub fn new(initial: ConnectionState) -> Self {
        Self {
            value: AtomicU8::new(initial.as_u8()),
        }
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.value.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, state: ConnectionState) {
        self.value.store(state.as_u8(), Ordering::Release);
    }

    /// Transition only if the current state matches; returns the winner's view
    pub fn compare_exchange(
        &self,
        current: ConnectionState,
        new: ConnectionState,
    ) -> std::result::Result<ConnectionState, ConnectionState> {
        self.value
            .compare_exchange(
                current.as_u8(),
                new.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(ConnectionState::from_u8)
            .map_err(ConnectionState::from_u8)
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.get() == ConnectionState::Open
    }
}

/// Atomic state plus a watch mirror for async observers
pub(crate) struct StateCell {
    atomic: AtomicConnectionState,
    watch_tx: watch::Sender<ConnectionState>,
}

impl StateCell {
    pub(crate) fn new(initial: ConnectionState) -> Self {
        let (watch_tx, _) = watch::channel(initial);
        Self {
            atomic: AtomicConnectionState::new(initial),
            watch_tx,
        }
    }

    pub(crate) fn get(&self) -> ConnectionState {
        self.atomic.get()
    }

    pub(crate) fn set(&self, state: ConnectionState) {
        self.atomic.set(state);
        let _ = self.watch_tx.send(state);
    }

    pub(crate) fn compare_exchange(
        &self,
        current: ConnectionState,
        new: ConnectionState,
    ) -> std::result::Result<ConnectionState, ConnectionState> {
        let result = self.atomic.compare_exchange(current, new);
        if result.is_ok() {
            let _ = self.watch_tx.send(new);
        }
        result
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.watch_tx.subscribe()
    }
}

/// Lock-free traffic counters
#[derive(Default)]
pub struct AtomicMetrics {
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
    reconnects: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    pub fn reconnects(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }
}

/// Point-in-time metrics view
#[derive(Debug, Clone)]
pub struct Metrics {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub reconnects: u64,
    pub connection_state: ConnectionState,
}
