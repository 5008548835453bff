//! Request/response correlation
//!
//! The pending-request table maps correlation ids to oneshot continuations.
//! Every entry is settled exactly once: by a matching response, a timeout, a
//! caller cancellation, or connection teardown. Whichever removes the entry
//! from the table first wins, and the loser's completion is a no-op.

use crate::codec::Envelope;
use crate::traits::error::{ClientError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::debug;

/// Ephemeral record for one in-flight request
pub(crate) struct PendingRequest {
    /// Action name, for diagnostics only
    action: String,
    created_at: Instant,
    tx: oneshot::Sender<Result<Envelope>>,
}

/// Pending-request table
///
/// Owned by the lifecycle/correlator pair; nothing outside this module
/// touches the map.
#[derive(Default)]
pub(crate) struct Correlator {
    pending: Mutex<HashMap<String, PendingRequest>>,
}

impl Correlator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a new pending entry and hand back its completion side
    pub(crate) fn register(
        &self,
        correlation_id: &str,
        action: &str,
    ) -> Result<oneshot::Receiver<Result<Envelope>>> {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending.lock();

        // Correlation ids are UUIDs; a collision here means a caller bug.
        if pending.contains_key(correlation_id) {
            return Err(ClientError::Configuration(format!(
                "correlation id {correlation_id} is already in flight"
            )));
        }

        pending.insert(
            correlation_id.to_string(),
            PendingRequest {
                action: action.to_string(),
                created_at: Instant::now(),
                tx,
            },
        );
        Ok(rx)
    }

    /// Resolve the entry matching an inbound response envelope
    ///
    /// Returns false when no entry matches (unsolicited push, or the request
    /// already timed out) so the caller can re-emit the envelope as a
    /// `message` event.
    pub(crate) fn resolve(&self, correlation_id: &str, response: Envelope) -> bool {
        let Some(entry) = self.pending.lock().remove(correlation_id) else {
            return false;
        };
        debug!(
            action = %entry.action,
            elapsed_ms = entry.created_at.elapsed().as_millis() as u64,
            "response matched pending request"
        );
        let _ = entry.tx.send(Ok(response));
        true
    }

    /// Remove an entry without completing it (timeout path)
    pub(crate) fn take(&self, correlation_id: &str) -> bool {
        self.pending.lock().remove(correlation_id).is_some()
    }

    /// Cancel one in-flight request
    pub(crate) fn cancel(&self, correlation_id: &str) -> bool {
        let Some(entry) = self.pending.lock().remove(correlation_id) else {
            return false;
        };
        let _ = entry.tx.send(Err(ClientError::RequestCancelled {
            correlation_id: correlation_id.to_string(),
        }));
        true
    }

    /// Reject every outstanding entry, in correlation-id order
    ///
    /// Used on connection teardown; each entry is settled exactly once
    /// because removal and completion happen together.
    pub(crate) fn reject_all(&self, make_error: impl Fn(&str, &str) -> ClientError) {
        let mut drained: Vec<(String, PendingRequest)> = {
            let mut pending = self.pending.lock();
            pending.drain().collect()
        };
        drained.sort_by(|a, b| a.0.cmp(&b.0));

        for (correlation_id, entry) in drained {
            let _ = entry.tx.send(Err(make_error(&correlation_id, &entry.action)));
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.pending.lock().len()
    }
}
