//! Common test utilities for actionwire integration tests
//!
//! Provides a mock envelope server: a real WebSocket endpoint that speaks
//! the wire protocol with scriptable behaviors (echo, stay silent, delay,
//! shuffle response order, drop connections).

use actionwire::ClientEvent;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;

/// How the mock server reacts to request envelopes
#[derive(Debug, Clone)]
pub enum ServerBehavior {
    /// Respond to every request with an echo response envelope
    Echo,
    /// Accept frames, never respond
    Silent,
    /// Respond after a fixed delay
    Delayed(Duration),
    /// Buffer this many requests, then respond in reverse arrival order
    ReverseBatch(usize),
    /// Close the first accepted connection right away, echo afterwards
    CloseFirstThenEcho,
    /// Send one unsolicited push right after the handshake, then echo
    PushThenEcho,
    /// Send one unparseable frame right after the handshake, then echo
    GarbageThenEcho,
}

pub struct MockEnvelopeServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    frames: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<String>>>,
    handshake_protocols: Arc<Mutex<Option<String>>>,
}

impl MockEnvelopeServer {
    pub async fn start(behavior: ServerBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let frames = Arc::new(AtomicUsize::new(0));
        let received = Arc::new(Mutex::new(Vec::new()));
        let handshake_protocols = Arc::new(Mutex::new(None));
        let connections = Arc::new(AtomicUsize::new(0));

        {
            let shutdown = shutdown.clone();
            let frames = frames.clone();
            let received = received.clone();
            let handshake_protocols = handshake_protocols.clone();

            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        result = listener.accept() => {
                            match result {
                                Ok((stream, _)) => {
                                    let connection_index = connections.fetch_add(1, Ordering::SeqCst);
                                    let behavior = behavior.clone();
                                    let shutdown = shutdown.clone();
                                    let frames = frames.clone();
                                    let received = received.clone();
                                    let handshake_protocols = handshake_protocols.clone();
                                    tokio::spawn(async move {
                                        handle_connection(
                                            stream,
                                            behavior,
                                            connection_index,
                                            shutdown,
                                            frames,
                                            received,
                                            handshake_protocols,
                                        )
                                        .await;
                                    });
                                }
                                Err(_) => break,
                            }
                        }
                        _ = shutdown.notified() => break,
                    }
                }
            });
        }

        Self {
            addr,
            shutdown,
            frames,
            received,
            handshake_protocols,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Number of text frames received across all connections
    pub fn frames_received(&self) -> usize {
        self.frames.load(Ordering::SeqCst)
    }

    /// Raw text frames in arrival order
    pub fn received_frames(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    /// `Sec-WebSocket-Protocol` value of the most recent handshake
    pub fn handshake_protocols(&self) -> Option<String> {
        self.handshake_protocols.lock().unwrap().clone()
    }

    /// Drop the listener and every open connection
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockEnvelopeServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn handle_connection(
    stream: tokio::net::TcpStream,
    behavior: ServerBehavior,
    connection_index: usize,
    shutdown: Arc<Notify>,
    frames: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<String>>>,
    handshake_protocols: Arc<Mutex<Option<String>>>,
) {
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::accept_hdr_async;
    use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
    use tokio_tungstenite::tungstenite::Message;

    let protocols_slot = handshake_protocols.clone();
    let callback = move |request: &Request, mut response: Response| {
        if let Some(value) = request.headers().get("sec-websocket-protocol") {
            let value = value.to_str().unwrap_or_default().to_string();
            // Select the first offered subprotocol, as a conforming server must
            // when the client advertises any; tungstenite rejects the handshake
            // otherwise ("Server sent no subprotocol").
            if let Some(selected) = value.split(',').next() {
                let selected = selected.trim().to_string();
                if let Ok(header) = selected.parse() {
                    response
                        .headers_mut()
                        .insert("sec-websocket-protocol", header);
                }
            }
            *protocols_slot.lock().unwrap() = Some(value);
        }
        Ok(response)
    };

    let ws_stream = match accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("mock server handshake failed: {e}");
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    if matches!(behavior, ServerBehavior::CloseFirstThenEcho) && connection_index == 0 {
        let _ = write.close().await;
        return;
    }

    match &behavior {
        ServerBehavior::PushThenEcho => {
            let push = json!({
                "headers": { "action": "notice", "timestamp": 1 },
                "payload": { "kind": "maintenance" }
            });
            let _ = write.send(Message::Text(push.to_string())).await;
        }
        ServerBehavior::GarbageThenEcho => {
            let _ = write.send(Message::Text("%%% not an envelope %%%".into())).await;
        }
        _ => {}
    }

    let mut batch: Vec<Value> = Vec::new();

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        frames.fetch_add(1, Ordering::SeqCst);
                        received.lock().unwrap().push(text.clone());

                        let Ok(request) = serde_json::from_str::<Value>(&text) else {
                            continue;
                        };
                        // The auth handshake frame is consumed, not answered.
                        if request["headers"]["action"] == json!("authenticate") {
                            continue;
                        }

                        match &behavior {
                            ServerBehavior::Silent => {}
                            ServerBehavior::Delayed(delay) => {
                                tokio::time::sleep(*delay).await;
                                if write.send(Message::Text(response_for(&request).to_string())).await.is_err() {
                                    break;
                                }
                            }
                            ServerBehavior::ReverseBatch(size) => {
                                batch.push(request);
                                if batch.len() >= *size {
                                    for buffered in batch.drain(..).rev() {
                                        if write.send(Message::Text(response_for(&buffered).to_string())).await.is_err() {
                                            return;
                                        }
                                    }
                                }
                            }
                            _ => {
                                if write.send(Message::Text(response_for(&request).to_string())).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            _ = shutdown.notified() => break,
        }
    }
}

/// Build the response envelope for a request: same action and correlation
/// id, the request payload echoed back
fn response_for(request: &Value) -> Value {
    json!({
        "headers": {
            "action": request["headers"]["action"],
            "correlationId": request["headers"]["correlationId"],
            "idempotencyKey": "srv-reply",
            "timestamp": 1
        },
        "payload": {
            "status": "ok",
            "echo": request["payload"]
        }
    })
}

/// Poll a crossbeam event receiver from async context
pub async fn next_event(
    rx: &crossbeam_channel::Receiver<ClientEvent>,
    timeout: Duration,
) -> Option<ClientEvent> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Ok(event) = rx.try_recv() {
            return Some(event);
        }
        if tokio::time::Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Drain everything currently queued on an event receiver
pub fn drain_events(rx: &crossbeam_channel::Receiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
