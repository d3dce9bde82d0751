//! Test helpers for integration tests
//!
//! Provides utilities for spawning the relay and a durable-store stub on
//! ephemeral ports, plus a typed WebSocket client.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use homelink_common::{AppConfig, AppSettings, CorsConfig, Environment, ServerConfig, StoreConfig};
use homelink_core::{ClientEvent, MessageId, NewMessage, ServerEvent, StoredMessage, UserId};
use homelink_relay::server::{create_app, RelayState};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// How long a single typed recv may take before the test fails
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a test configuration
pub fn test_config() -> AppConfig {
    AppConfig {
        app: AppSettings {
            name: "homelink-test".to_string(),
            env: Environment::Development,
        },
        relay: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        store: StoreConfig {
            base_url: "http://127.0.0.1:0".to_string(),
            timeout_secs: 5,
        },
        cors: CorsConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
    }
}

/// Relay instance bound to an ephemeral port
pub struct TestRelay {
    pub addr: SocketAddr,
    _handle: JoinHandle<()>,
}

impl TestRelay {
    /// Start a relay for this test
    pub async fn start() -> Result<Self> {
        let state = RelayState::new(test_config());
        let app = create_app(state);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            addr,
            _handle: handle,
        })
    }

    /// WebSocket URL of the relay
    pub fn ws_url(&self) -> String {
        format!("ws://{}/gateway", self.addr)
    }

    /// Base HTTP URL of the relay
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Open a raw (not yet joined) client
    pub async fn client(&self) -> Result<RelayClient> {
        RelayClient::connect(&self.ws_url()).await
    }

    /// Open a client and join under an identity, swallowing the presence
    /// snapshot
    pub async fn join(&self, user: &str) -> Result<RelayClient> {
        let mut client = self.client().await?;
        client
            .send(ClientEvent::Join {
                user_id: UserId::new(user),
            })
            .await?;

        match client.recv().await? {
            ServerEvent::PresenceSnapshot { .. } => Ok(client),
            other => bail!("expected presence snapshot after join, got {other:?}"),
        }
    }
}

/// Typed WebSocket client against the relay
pub struct RelayClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl RelayClient {
    /// Connect to a relay URL
    pub async fn connect(url: &str) -> Result<Self> {
        let (ws, _response) = connect_async(url).await.context("ws connect failed")?;
        Ok(Self { ws })
    }

    /// Send a client event
    pub async fn send(&mut self, event: ClientEvent) -> Result<()> {
        let json = event.to_json()?;
        self.ws.send(Message::Text(json.into())).await?;
        Ok(())
    }

    /// Send a raw text frame
    pub async fn send_raw(&mut self, text: &str) -> Result<()> {
        self.ws.send(Message::Text(text.to_string().into())).await?;
        Ok(())
    }

    /// Receive the next server event, failing after a timeout
    pub async fn recv(&mut self) -> Result<ServerEvent> {
        let deadline = tokio::time::sleep(RECV_TIMEOUT);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                () = &mut deadline => bail!("timed out waiting for a server event"),
                msg = self.ws.next() => match msg {
                    Some(Ok(Message::Text(text))) => return Ok(ServerEvent::from_json(&text)?),
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Ok(Message::Close(frame))) => bail!("connection closed: {frame:?}"),
                    Some(Ok(other)) => bail!("unexpected frame: {other:?}"),
                    Some(Err(e)) => bail!("ws error: {e}"),
                    None => bail!("stream ended"),
                },
            }
        }
    }

    /// Assert that nothing arrives within the window
    pub async fn expect_silence(&mut self, window: Duration) -> Result<()> {
        match tokio::time::timeout(window, self.ws.next()).await {
            Err(_) => Ok(()),
            Ok(Some(Ok(Message::Text(text)))) => bail!("unexpected event: {text}"),
            Ok(other) => bail!("unexpected frame: {other:?}"),
        }
    }

    /// Close the connection
    pub async fn close(mut self) -> Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}

/// In-memory durable-store stub speaking the marketplace REST surface
///
/// Derives the caller's identity from the bearer token, exactly as the real
/// store derives it from its JWT.
pub struct TestStore {
    pub addr: SocketAddr,
    messages: Arc<Mutex<Vec<StoredMessage>>>,
    _handle: JoinHandle<()>,
}

#[derive(Clone)]
struct StoreStubState {
    messages: Arc<Mutex<Vec<StoredMessage>>>,
    next_id: Arc<AtomicU64>,
}

impl TestStore {
    /// Start a store stub for this test
    pub async fn start() -> Result<Self> {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let state = StoreStubState {
            messages: messages.clone(),
            next_id: Arc::new(AtomicU64::new(1)),
        };

        let app = Router::new()
            .route(
                "/api/chat/messages",
                post(persist_message).get(fetch_history),
            )
            .route("/api/chat/read", patch(mark_read))
            .route("/api/chat/conversations", get(fetch_conversations))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            addr,
            messages,
            _handle: handle,
        })
    }

    /// Store configuration pointing at the stub
    pub fn config(&self) -> StoreConfig {
        StoreConfig {
            base_url: format!("http://{}", self.addr),
            timeout_secs: 5,
        }
    }

    /// Number of persisted messages
    pub fn message_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

fn caller_from_bearer(headers: &HeaderMap) -> UserId {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("anonymous");
    UserId::new(token)
}

async fn persist_message(
    State(state): State<StoreStubState>,
    headers: HeaderMap,
    Json(message): Json<NewMessage>,
) -> Json<serde_json::Value> {
    let stored = StoredMessage {
        id: MessageId::new(format!("m{}", state.next_id.fetch_add(1, Ordering::SeqCst))),
        from: caller_from_bearer(&headers),
        to: message.to,
        body: message.body,
        listing_id: message.listing_id,
        listing_name: message.listing_name,
        read: false,
        read_at: None,
        created_at: Utc::now(),
    };
    state.messages.lock().unwrap().push(stored.clone());
    Json(json!({ "message": stored }))
}

async fn fetch_history(
    State(state): State<StoreStubState>,
    headers: HeaderMap,
    Query(params): Query<std::collections::HashMap<String, String>>,
) -> Json<serde_json::Value> {
    let me = caller_from_bearer(&headers);
    let peer = params
        .get("userId")
        .map(|s| UserId::new(s.as_str()))
        .unwrap_or_else(|| UserId::new(""));

    let mut messages: Vec<StoredMessage> = state
        .messages
        .lock()
        .unwrap()
        .iter()
        .filter(|m| (m.from == me && m.to == peer) || (m.from == peer && m.to == me))
        .cloned()
        .collect();
    messages.sort_by_key(|m| m.created_at);

    Json(json!({ "messages": messages }))
}

async fn mark_read(
    State(state): State<StoreStubState>,
    headers: HeaderMap,
    Query(params): Query<std::collections::HashMap<String, String>>,
) -> Json<serde_json::Value> {
    let me = caller_from_bearer(&headers);
    let from = params
        .get("from")
        .map(|s| UserId::new(s.as_str()))
        .unwrap_or_else(|| UserId::new(""));

    let mut count = 0;
    for m in state.messages.lock().unwrap().iter_mut() {
        if m.from == from && m.to == me && !m.read {
            m.read = true;
            m.read_at = Some(Utc::now());
            count += 1;
        }
    }

    Json(json!({ "message": "Messages marked as read", "count": count }))
}

async fn fetch_conversations() -> Json<serde_json::Value> {
    Json(json!({ "conversations": [] }))
}
