//! Integration tests for connection lifecycle, security policy and authentication

mod common;

use actionwire::{
    AuthTransport, ClientBuilder, ClientEvent, ConnectionState, CredentialMethod, DeploymentTarget,
    FixedDelay, StaticToken,
};
use common::{drain_events, MockEnvelopeServer, ServerBehavior};
use serde_json::json;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[tokio::test]
async fn sandboxed_target_rejects_insecure_scheme_before_any_connection() {
    let client = ClientBuilder::new()
        .url("ws://127.0.0.1:9")
        .target(DeploymentTarget::BrowserSandbox)
        .token_provider(StaticToken("t".into()))
        .build()
        .unwrap();

    let err = client.open().await.unwrap_err();
    assert_eq!(err.code(), "EC_INSECURE_SCHEME");
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(client.metrics().frames_sent, 0);
}

#[tokio::test]
async fn sandboxed_target_requires_a_credential_source() {
    let client = ClientBuilder::new()
        .url("wss://actions.example.com")
        .target(DeploymentTarget::BrowserSandbox)
        .build()
        .unwrap();

    let err = client.open().await.unwrap_err();
    assert_eq!(err.code(), "EC_MISSING_CREDENTIAL_SOURCE");
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn credential_failure_fails_the_client_without_retries() {
    struct SealedVault;

    #[async_trait::async_trait]
    impl actionwire::TokenProvider for SealedVault {
        async fn acquire(&self) -> actionwire::Result<String> {
            Err(actionwire::ClientError::CredentialAcquisition("vault sealed".into()))
        }
    }

    let client = ClientBuilder::new()
        .url("ws://127.0.0.1:9")
        .target(DeploymentTarget::Server)
        .token_provider(SealedVault)
        .reconnect_strategy(FixedDelay::new(Duration::from_millis(10), Some(5)))
        .build()
        .unwrap();

    let err = client.open().await.unwrap_err();
    assert_eq!(err.code(), "EC_CREDENTIAL_ACQUISITION");
    assert_eq!(client.state(), ConnectionState::Failed);
    // Credential errors never enter the reconnect cycle.
    assert_eq!(client.metrics().reconnects, 0);
}

#[tokio::test]
async fn unreachable_endpoint_exhausts_reconnects_then_fails() {
    let client = ClientBuilder::new()
        // Reserved port; connection is refused immediately.
        .url("ws://127.0.0.1:1")
        .target(DeploymentTarget::Server)
        .auth_required(false)
        .reconnect_strategy(FixedDelay::new(Duration::from_millis(10), Some(2)))
        .build()
        .unwrap();

    let err = client.open().await.unwrap_err();
    assert_eq!(err.code(), "EC_TRANSPORT");
    assert_eq!(client.state(), ConnectionState::Failed);
    assert_eq!(client.metrics().reconnects, 2);
}

#[tokio::test]
async fn client_reconnects_after_losing_the_first_connection() {
    let server = MockEnvelopeServer::start(ServerBehavior::CloseFirstThenEcho).await;
    let client = ClientBuilder::new()
        .url(server.ws_url())
        .target(DeploymentTarget::Server)
        .auth_required(false)
        .reconnect_strategy(FixedDelay::new(Duration::from_millis(50), Some(5)))
        .build()
        .unwrap();
    let events = client.subscribe();

    client.open().await.unwrap();

    // Wait out the drop of the first connection and the reconnect.
    let mut reopened = false;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if client.metrics().reconnects >= 1 && client.state() == ConnectionState::Open {
            reopened = true;
            break;
        }
    }
    assert!(reopened, "client should have reconnected");

    let response = client
        .interaction(json!({ "session": { "id": "s" }, "request": { "input": "back" } }))
        .await
        .unwrap();
    assert_eq!(response.payload["status"], json!("ok"));

    let saw_reconnecting = drain_events(&events)
        .iter()
        .any(|event| matches!(event, ClientEvent::Reconnecting { .. }));
    assert!(saw_reconnecting);

    client.close().await;
}

#[tokio::test]
async fn close_twice_is_idempotent_and_emits_a_single_close_event() {
    let server = MockEnvelopeServer::start(ServerBehavior::Echo).await;
    let client = ClientBuilder::new()
        .url(server.ws_url())
        .target(DeploymentTarget::Server)
        .auth_required(false)
        .no_reconnect()
        .build()
        .unwrap();
    let events = client.subscribe();

    client.open().await.unwrap();
    client.close().await;
    client.close().await;

    assert_eq!(client.state(), ConnectionState::Disconnected);
    let close_events = drain_events(&events)
        .into_iter()
        .filter(|event| matches!(event, ClientEvent::Close { .. }))
        .count();
    assert_eq!(close_events, 1);
}

#[tokio::test]
async fn open_is_idempotent_while_already_open() {
    let server = MockEnvelopeServer::start(ServerBehavior::Echo).await;
    let client = ClientBuilder::new()
        .url(server.ws_url())
        .target(DeploymentTarget::Server)
        .auth_required(false)
        .no_reconnect()
        .build()
        .unwrap();

    client.open().await.unwrap();
    client.open().await.unwrap();
    assert_eq!(client.state(), ConnectionState::Open);

    client.close().await;
}

#[tokio::test]
async fn handshake_auth_mode_sends_the_credential_as_first_frame() {
    let server = MockEnvelopeServer::start(ServerBehavior::Echo).await;
    let client = ClientBuilder::new()
        .url(server.ws_url())
        .target(DeploymentTarget::Server)
        .token_provider(StaticToken("handshake-tok".into()))
        .auth_transport(AuthTransport::Handshake)
        .no_reconnect()
        .build()
        .unwrap();

    client.open().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let frames = server.received_frames();
    assert!(!frames.is_empty());
    let first: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
    assert_eq!(first["headers"]["action"], json!("authenticate"));
    assert_eq!(first["payload"]["token"], json!("handshake-tok"));

    client.close().await;
}

#[tokio::test]
async fn subprotocol_auth_mode_rides_the_websocket_handshake() {
    let server = MockEnvelopeServer::start(ServerBehavior::Echo).await;
    let client = ClientBuilder::new()
        .url(server.ws_url())
        .target(DeploymentTarget::Server)
        .token_provider(StaticToken("proto-tok".into()))
        .auth_transport(AuthTransport::Subprotocol)
        .no_reconnect()
        .build()
        .unwrap();

    client.open().await.unwrap();

    let protocols = server.handshake_protocols().expect("handshake should carry protocols");
    assert!(protocols.contains("envelope.v1"));
    assert!(protocols.contains("bearer.proto-tok"));

    // No auth frame in handshake-free mode: the first text frame is the request.
    let response = client
        .interaction(json!({ "session": { "id": "s" }, "request": { "input": "hi" } }))
        .await
        .unwrap();
    assert_eq!(response.payload["status"], json!("ok"));
    let frames = server.received_frames();
    let first: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
    assert_eq!(first["headers"]["action"], json!("interaction"));

    client.close().await;
}

#[tokio::test]
async fn static_credentials_exchange_against_the_auth_endpoint() {
    // Minimal one-shot HTTP responder standing in for the auth endpoint.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let auth_addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut stream, _)) = listener.accept().await {
            let mut buffer = [0u8; 4096];
            let _ = stream.read(&mut buffer).await;
            let body = r#"{"token":"exchanged-tok"}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    let client = ClientBuilder::new()
        .url("ws://127.0.0.1:9")
        .target(DeploymentTarget::Server)
        .static_credentials("svc-client", "svc-secret", format!("http://{auth_addr}/token"))
        .build()
        .unwrap();

    let credential = client.authenticate().await.unwrap();
    assert_eq!(credential.token, "exchanged-tok");
    assert_eq!(credential.method, CredentialMethod::StaticExchange);
}
