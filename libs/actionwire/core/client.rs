//! Client runtime
//!
//! One spawned task per client owns the socket and the state machine: an
//! outer loop drives policy → credential → connect cycles with backoff, an
//! inner loop multiplexes inbound frames against caller commands. Everything
//! the caller sees goes through promise-style `send` completions or the
//! typed event bus.

use crate::auth::{AuthProvider, AuthTransport, Credential};
use crate::codec::{self, Envelope};
use crate::core::config::{ClientConfig, SendOptions};
use crate::core::connection_state::{AtomicMetrics, ConnectionState, Metrics, StateCell};
use crate::core::correlator::Correlator;
use crate::policy;
use crate::traits::error::{ClientError, Result};
use crate::traits::events::{ClientEvent, EventBus};
use crate::traits::validator::{SchemaValidator, Validation};
use crate::validate;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = futures::stream::SplitSink<WsStream, Message>;
type WsSource = futures::stream::SplitStream<WsStream>;

/// Caller-side commands for the connection task
#[derive(Debug)]
enum Command {
    /// Transmit an encoded frame
    Transmit(String),
    /// Graceful close
    Close,
}

/// How one connection cycle ended
enum CycleEnd {
    /// `close()` was called
    ClosedByUser,
    /// Remote close frame or end of stream
    Remote { code: Option<u16>, reason: String },
    /// Transport-level failure
    Faulted(ClientError),
}

pub(crate) struct ClientInner {
    pub(crate) config: ClientConfig,
    pub(crate) state: StateCell,
    pub(crate) correlator: Correlator,
    pub(crate) events: EventBus,
    pub(crate) metrics: AtomicMetrics,
    pub(crate) auth: AuthProvider,
    pub(crate) validator: Box<dyn SchemaValidator>,
    /// true while the connection task should keep running
    run_flag: AtomicBool,
    command_tx: Mutex<Option<mpsc::UnboundedSender<Command>>>,
    task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

/// Envelope-protocol client
///
/// Cheap to clone; all clones share one connection and one pending-request
/// table.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl Client {
    pub(crate) fn from_config(config: ClientConfig) -> Self {
        let auth = AuthProvider::from_config(&config);
        let validator = validate::for_target(config.deployment_target());

        Self {
            inner: Arc::new(ClientInner {
                config,
                state: StateCell::new(ConnectionState::Disconnected),
                correlator: Correlator::new(),
                events: EventBus::new(),
                metrics: AtomicMetrics::new(),
                auth,
                validator,
                run_flag: AtomicBool::new(false),
                command_tx: Mutex::new(None),
                task: Mutex::new(None),
            }),
        }
    }

    /// Open the connection
    ///
    /// Security policy violations surface here before any network activity.
    /// Otherwise the call resolves when the first connection cycle reaches
    /// `Open` (Ok) or `Failed` (Err). Opening an already-open client is a
    /// no-op.
    pub async fn open(&self) -> Result<()> {
        let inner = &self.inner;

        policy::enforce(
            inner.config.transport_url(),
            inner.config.deployment_target(),
            &inner.config,
        )?;

        let started = inner
            .state
            .compare_exchange(ConnectionState::Disconnected, ConnectionState::Authenticating)
            .or_else(|_| {
                inner
                    .state
                    .compare_exchange(ConnectionState::Failed, ConnectionState::Authenticating)
            });
        if started.is_err() {
            // Already open or mid-transition; idempotent.
            return Ok(());
        }

        inner.run_flag.store(true, Ordering::Release);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        *inner.command_tx.lock() = Some(command_tx);

        let (ready_tx, ready_rx) = oneshot::channel();
        let task_inner = Arc::clone(inner);
        let handle = tokio::spawn(async move {
            run_connection(task_inner, command_rx, ready_tx).await;
        });
        *inner.task.lock() = Some(handle);

        ready_rx.await.unwrap_or_else(|_| {
            Err(ClientError::ConnectionLost(
                "connection task exited before startup completed".into(),
            ))
        })
    }

    /// Close the connection gracefully
    ///
    /// Outstanding requests are rejected with `ConnectionClosed`. Calling
    /// close twice neither fails nor double-emits the `close` event.
    pub async fn close(&self) {
        self.inner.run_flag.store(false, Ordering::Release);

        let command_tx = self.inner.command_tx.lock().take();
        if let Some(tx) = command_tx {
            let _ = tx.send(Command::Close);
        }

        let handle = self.inner.task.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Send an action request and await its correlated response
    pub async fn send(&self, action: &str, payload: Value, options: SendOptions) -> Result<Envelope> {
        let inner = &self.inner;
        let timeout = options.timeout.unwrap_or(inner.config.request_timeout());

        let state = inner.state.get();
        if state != ConnectionState::Open {
            if inner.config.buffer_requests() && state.is_pending_open() {
                self.wait_for_open(timeout).await?;
            } else {
                return Err(ClientError::ConnectionClosed(format!(
                    "client is not open (state {state:?})"
                )));
            }
        }

        let mut envelope = codec::encode(action, payload)?;
        if let Some(id) = &options.correlation_id {
            envelope.headers.correlation_id = Some(id.clone());
        }
        if let Some(key) = &options.idempotency_key {
            envelope.headers.idempotency_key = Some(key.clone());
        }
        envelope.headers.tenant_id = options
            .tenant_id
            .clone()
            .or_else(|| inner.config.tenant_id().map(str::to_string));
        envelope.headers.trace_id = options.trace_id.clone();

        if inner.config.strict_validation() {
            let outcome = inner.validator.validate(action, &envelope.payload);
            if !outcome.valid {
                return Err(ClientError::Validation {
                    schema: action.to_string(),
                    errors: outcome.into_errors(),
                });
            }
        }

        let frame = envelope.to_frame()?;
        let correlation_id = envelope
            .correlation_id()
            .map(str::to_string)
            .ok_or_else(|| ClientError::MalformedPayload("envelope lost its correlation id".into()))?;

        let mut rx = inner.correlator.register(&correlation_id, action)?;

        let command_tx = inner.command_tx.lock().clone();
        let dispatched = match command_tx {
            Some(tx) => tx.send(Command::Transmit(frame)).is_ok(),
            None => false,
        };
        if !dispatched {
            inner.correlator.take(&correlation_id);
            return Err(ClientError::ConnectionLost(
                "connection task is gone".into(),
            ));
        }

        tokio::select! {
            completion = &mut rx => match completion {
                Ok(result) => result,
                Err(_) => Err(ClientError::ConnectionLost("pending request dropped".into())),
            },
            _ = tokio::time::sleep(timeout) => {
                if inner.correlator.take(&correlation_id) {
                    Err(ClientError::RequestTimeout {
                        action: action.to_string(),
                        timeout_ms: timeout.as_millis() as u64,
                    })
                } else {
                    // The response won the race; its completion is already in flight.
                    match (&mut rx).await {
                        Ok(result) => result,
                        Err(_) => Err(ClientError::ConnectionLost("pending request dropped".into())),
                    }
                }
            }
        }
    }

    /// `interaction` action: converse over an existing session
    pub async fn interaction(&self, payload: Value) -> Result<Envelope> {
        self.send("interaction", payload, SendOptions::default()).await
    }

    /// `elevate` action: raise the session's privilege level
    pub async fn elevate(&self, payload: Value) -> Result<Envelope> {
        self.send("elevate", payload, SendOptions::default()).await
    }

    /// `translate` action
    pub async fn translate(&self, payload: Value) -> Result<Envelope> {
        self.send("translate", payload, SendOptions::default()).await
    }

    /// `insights` action: session analytics
    pub async fn insights(&self, payload: Value) -> Result<Envelope> {
        self.send("insights", payload, SendOptions::default()).await
    }

    /// Cancel one in-flight request
    ///
    /// Returns true when a pending entry was cancelled; the corresponding
    /// `send` rejects with `RequestCancelled`. Other requests are unaffected.
    pub fn cancel(&self, correlation_id: &str) -> bool {
        self.inner.correlator.cancel(correlation_id)
    }

    /// Resolve a credential on demand, outside the connection lifecycle
    pub async fn authenticate(&self) -> Result<Credential> {
        self.inner.auth.authenticate().await
    }

    /// Advisory validation against a registered schema
    pub fn validate(&self, schema: &str, data: &Value) -> Validation {
        self.inner.validator.validate(schema, data)
    }

    /// Subscribe to lifecycle and traffic events
    pub fn subscribe(&self) -> crossbeam_channel::Receiver<ClientEvent> {
        self.inner.events.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.get()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn metrics(&self) -> Metrics {
        Metrics {
            frames_sent: self.inner.metrics.frames_sent(),
            frames_received: self.inner.metrics.frames_received(),
            reconnects: self.inner.metrics.reconnects(),
            connection_state: self.state(),
        }
    }

    /// Await the `Open` state, bounded by `limit` (buffered sends)
    async fn wait_for_open(&self, limit: Duration) -> Result<()> {
        let mut state_rx = self.inner.state.subscribe();

        let wait = async move {
            loop {
                let state = *state_rx.borrow_and_update();
                match state {
                    ConnectionState::Open => return Ok(()),
                    ConnectionState::Disconnected | ConnectionState::Closing | ConnectionState::Failed => {
                        return Err(ClientError::ConnectionClosed(
                            "connection ended before the request could be sent".into(),
                        ));
                    }
                    _ => {}
                }
                if state_rx.changed().await.is_err() {
                    return Err(ClientError::ConnectionClosed(
                        "connection ended before the request could be sent".into(),
                    ));
                }
            }
        };

        match tokio::time::timeout(limit, wait).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::RequestTimeout {
                action: "(buffered)".to_string(),
                timeout_ms: limit.as_millis() as u64,
            }),
        }
    }
}

/// Outer connection loop: one iteration per connection cycle
async fn run_connection(
    inner: Arc<ClientInner>,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
    ready_tx: oneshot::Sender<Result<()>>,
) {
    let mut ready = Some(ready_tx);
    let mut attempt: usize = 0;

    loop {
        if !inner.run_flag.load(Ordering::Acquire) {
            inner.state.set(ConnectionState::Disconnected);
            break;
        }

        inner.state.set(ConnectionState::Authenticating);

        // The guard runs before every attempt, reconnects included.
        if let Err(e) = policy::enforce(
            inner.config.transport_url(),
            inner.config.deployment_target(),
            &inner.config,
        ) {
            fail(&inner, &mut ready, e);
            break;
        }

        // Fresh credential per attempt; never reused across attempts.
        let credential = match inner.auth.resolve().await {
            Ok(credential) => credential,
            Err(e) => {
                // Credential errors are fatal for the cycle and never auto-retried.
                error!(code = e.code(), "credential resolution failed: {e}");
                fail(&inner, &mut ready, e);
                break;
            }
        };

        inner.state.set(ConnectionState::Connecting);

        let connected = connect_transport(&inner.config, credential.as_ref()).await;

        let cycle_end = match connected {
            Ok(stream) => {
                let (mut sink, mut source) = stream.split();

                let handshake_ok = send_handshake_auth(&inner, &mut sink, credential.as_ref()).await;
                match handshake_ok {
                    Ok(()) => {
                        info!(url = inner.config.transport_url(), "connection open");
                        inner.state.set(ConnectionState::Open);
                        inner.events.emit(ClientEvent::Open);
                        if let Some(tx) = ready.take() {
                            let _ = tx.send(Ok(()));
                        }
                        attempt = 0;

                        let end = frame_loop(&inner, &mut sink, &mut source, &mut command_rx).await;

                        if let CycleEnd::ClosedByUser = end {
                            inner.state.set(ConnectionState::Closing);
                            let _ = sink.close().await;
                        }
                        end
                    }
                    Err(e) => CycleEnd::Faulted(e),
                }
            }
            Err(e) => CycleEnd::Faulted(e),
        };

        let mut last_error: Option<ClientError> = None;
        match cycle_end {
            CycleEnd::ClosedByUser => {
                inner.correlator.reject_all(|id, action| {
                    ClientError::ConnectionClosed(format!(
                        "request {id} ({action}) abandoned by graceful close"
                    ))
                });
                inner.state.set(ConnectionState::Disconnected);
                inner.events.emit(ClientEvent::Close {
                    code: None,
                    reason: "closed by client".into(),
                });
                break;
            }
            CycleEnd::Remote { code, reason } => {
                warn!(?code, reason = reason.as_str(), "transport closed by peer");
                inner.correlator.reject_all(|id, action| {
                    ClientError::ConnectionLost(format!("request {id} ({action}) lost with the connection"))
                });
                inner.events.emit(ClientEvent::Close { code, reason });
            }
            CycleEnd::Faulted(e) => {
                error!(code = e.code(), "connection cycle faulted: {e}");
                inner.correlator.reject_all(|id, action| {
                    ClientError::ConnectionLost(format!("request {id} ({action}) lost with the connection"))
                });
                inner.events.emit(ClientEvent::Error(e.clone()));
                if inner.state.get() == ConnectionState::Open {
                    inner.events.emit(ClientEvent::Close {
                        code: None,
                        reason: e.to_string(),
                    });
                }
                last_error = Some(e);
            }
        }

        if !inner.run_flag.load(Ordering::Acquire) {
            inner.state.set(ConnectionState::Disconnected);
            break;
        }

        match inner.config.reconnect().next_delay(attempt) {
            Some(delay) => {
                inner.state.set(ConnectionState::Reconnecting);
                inner.events.emit(ClientEvent::Reconnecting { attempt: attempt + 1 });
                inner.metrics.increment_reconnects();
                info!(attempt = attempt + 1, ?delay, "reconnecting after delay");

                if !interruptible_sleep(&inner, delay).await {
                    inner.state.set(ConnectionState::Disconnected);
                    break;
                }
                attempt += 1;
            }
            None => {
                let error = last_error.unwrap_or_else(|| {
                    ClientError::ConnectionLost("reconnection attempts exhausted".into())
                });
                if ready.is_some() {
                    // The first cycle never reached Open: terminal failure.
                    fail(&inner, &mut ready, error);
                } else if attempt == 0 {
                    // Reconnect disabled: a lost connection leaves the client disconnected.
                    inner.state.set(ConnectionState::Disconnected);
                } else {
                    warn!("reconnection attempts exhausted");
                    inner.state.set(ConnectionState::Failed);
                    inner.events.emit(ClientEvent::Error(error));
                }
                break;
            }
        }
    }

    debug!("connection task exiting");
}

/// Mark the client failed and deliver the startup result if still awaited
fn fail(inner: &ClientInner, ready: &mut Option<oneshot::Sender<Result<()>>>, error: ClientError) {
    eprintln!("LIBDBG fail() called with: {error:?}");
    inner.state.set(ConnectionState::Failed);
    inner.events.emit(ClientEvent::Error(error.clone()));
    inner.correlator.reject_all(|id, action| {
        ClientError::ConnectionLost(format!("request {id} ({action}) lost with the connection"))
    });
    if let Some(tx) = ready.take() {
        let _ = tx.send(Err(error));
    }
}

/// Open the transport, attaching the credential per the auth transport mode
async fn connect_transport(config: &ClientConfig, credential: Option<&Credential>) -> Result<WsStream> {
    let mut request = config
        .transport_url()
        .into_client_request()
        .map_err(|e| ClientError::Transport(format!("invalid transport url: {e}")))?;

    let mut protocols = vec![config.subprotocol().to_string()];
    if config.auth_transport() == AuthTransport::Subprotocol {
        if let Some(credential) = credential {
            protocols.push(format!("bearer.{}", credential.token));
        }
    }
    let header = protocols
        .join(", ")
        .parse::<http::HeaderValue>()
        .map_err(|e| ClientError::Configuration(format!("subprotocol is not header-safe: {e}")))?;
    request
        .headers_mut()
        .insert(http::header::SEC_WEBSOCKET_PROTOCOL, header);

    debug!(url = config.transport_url(), "opening transport");
    match tokio::time::timeout(config.connection_timeout(), connect_async(request)).await {
        Ok(Ok((stream, _response))) => Ok(stream),
        Ok(Err(e)) => Err(ClientError::Transport(e.to_string())),
        Err(_) => Err(ClientError::Transport(format!(
            "transport open timed out after {:?}",
            config.connection_timeout()
        ))),
    }
}

/// Handshake auth mode: the credential rides in the first frame after open
async fn send_handshake_auth(
    inner: &ClientInner,
    sink: &mut WsSink,
    credential: Option<&Credential>,
) -> Result<()> {
    if inner.config.auth_transport() != AuthTransport::Handshake {
        return Ok(());
    }
    let Some(credential) = credential else {
        return Ok(());
    };

    let envelope = codec::encode("authenticate", json!({ "token": credential.token }))?;
    sink.send(Message::Text(envelope.to_frame()?))
        .await
        .map_err(|e| ClientError::Transport(format!("auth handshake send failed: {e}")))?;
    inner.metrics.increment_sent();
    debug!("auth handshake frame sent");
    Ok(())
}

/// Inner loop for one open connection
async fn frame_loop(
    inner: &ClientInner,
    sink: &mut WsSink,
    source: &mut WsSource,
    command_rx: &mut mpsc::UnboundedReceiver<Command>,
) -> CycleEnd {
    loop {
        tokio::select! {
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    inner.metrics.increment_received();
                    handle_frame(inner, &text);
                }
                Some(Ok(Message::Binary(bytes))) => {
                    inner.metrics.increment_received();
                    match String::from_utf8(bytes) {
                        Ok(text) => handle_frame(inner, &text),
                        Err(_) => {
                            let e = ClientError::Protocol("binary frame is not valid UTF-8".into());
                            warn!("{e}");
                            inner.events.emit(ClientEvent::Error(e));
                        }
                    }
                }
                Some(Ok(Message::Close(close_frame))) => {
                    let (code, reason) = match close_frame {
                        Some(frame) => (Some(u16::from(frame.code)), frame.reason.to_string()),
                        None => (None, String::new()),
                    };
                    return CycleEnd::Remote { code, reason };
                }
                // Control frames carry no envelopes.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    return CycleEnd::Faulted(ClientError::Transport(e.to_string()));
                }
                None => {
                    return CycleEnd::Remote { code: None, reason: "stream ended".into() };
                }
            },

            command = command_rx.recv() => match command {
                Some(Command::Transmit(frame)) => {
                    if let Err(e) = sink.send(Message::Text(frame)).await {
                        return CycleEnd::Faulted(ClientError::Transport(e.to_string()));
                    }
                    inner.metrics.increment_sent();
                }
                Some(Command::Close) | None => {
                    return CycleEnd::ClosedByUser;
                }
            },
        }
    }
}

/// Decode, validate and route one inbound frame
///
/// Structural violations are logged, emitted as non-fatal `error` events and
/// the frame dropped; the connection stays open.
fn handle_frame(inner: &ClientInner, text: &str) {
    let envelope = match codec::decode(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(code = e.code(), "dropping malformed inbound frame: {e}");
            inner.events.emit(ClientEvent::Error(e));
            return;
        }
    };

    if inner.config.strict_validation() {
        let schema = validate::response_schema(envelope.action());
        let outcome = inner.validator.validate(&schema, &envelope.payload);
        if !outcome.valid {
            // Advisory on the inbound side: surface, then deliver anyway.
            inner.events.emit(ClientEvent::Error(ClientError::Validation {
                schema,
                errors: outcome.into_errors(),
            }));
        }
    }

    if let Some(correlation_id) = envelope.correlation_id().map(str::to_string) {
        if inner.correlator.resolve(&correlation_id, envelope.clone()) {
            return;
        }
    }

    // Unsolicited push, or a response whose request already timed out.
    inner.events.emit(ClientEvent::Message(envelope));
}

/// Sleep in short slices so shutdown stays responsive; false means interrupted
async fn interruptible_sleep(inner: &ClientInner, total: Duration) -> bool {
    const SLICE: Duration = Duration::from_millis(100);
    let mut elapsed = Duration::ZERO;

    while elapsed < total {
        if !inner.run_flag.load(Ordering::Acquire) {
            return false;
        }
        let nap = SLICE.min(total - elapsed);
        tokio::time::sleep(nap).await;
        elapsed += nap;
    }
    inner.run_flag.load(Ordering::Acquire)
}
