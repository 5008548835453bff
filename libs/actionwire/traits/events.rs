use crate::codec::Envelope;
use crate::traits::error::ClientError;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

/// Lifecycle and traffic events emitted by the client
///
/// Events are the only externally observable signals besides the completion
/// of individual requests. Delivery is channel-based: subscribers consume at
/// their own pace and can never synchronously re-enter a state transition.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Transport is open and requests are eligible to send
    Open,
    /// Inbound envelope that matched no pending request (unsolicited push,
    /// or a response that arrived after its request timed out)
    Message(Envelope),
    /// Non-fatal error: malformed inbound frame, failed inbound validation,
    /// transport fault. Carries the full error for its `code()`.
    Error(ClientError),
    /// Transport closed; `code`/`reason` echo the close frame when present
    Close { code: Option<u16>, reason: String },
    /// A reconnection attempt is about to be made
    Reconnecting { attempt: usize },
}

/// Publish/subscribe fan-out for [`ClientEvent`]
///
/// Each subscriber gets its own unbounded channel; senders whose receiver
/// was dropped are pruned on the next emit.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<ClientEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber and return its receiving end
    pub fn subscribe(&self) -> Receiver<ClientEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver an event to every live subscriber
    pub fn emit(&self, event: ClientEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
