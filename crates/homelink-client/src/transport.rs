//! Relay transport
//!
//! Connects the session's channels to a live WebSocket. The handshake
//! retries a bounded number of times with backoff before giving up; a
//! transport that dies after connecting is surfaced through the closed
//! channels, and the session never reconnects on its own.

use homelink_core::{ClientEvent, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Bounded handshake retries before the session stays Disconnected
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 5;

/// Base delay between handshake attempts; grows linearly per attempt
pub const DEFAULT_CONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Channel buffer size in each direction
const CHANNEL_BUFFER: usize = 32;

/// Transport error type
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("relay unreachable after {attempts} attempts: {last}")]
    Unreachable {
        attempts: u32,
        #[source]
        last: tokio_tungstenite::tungstenite::Error,
    },
}

/// The two channel halves a session talks through
pub struct RelayLink {
    /// Events to emit to the relay
    pub outbound: mpsc::Sender<ClientEvent>,
    /// Events pushed by the relay
    pub inbound: mpsc::Receiver<ServerEvent>,
}

/// Connect to the relay with bounded, backed-off handshake retries
///
/// On success, spawns one writer task and one reader task bridging the
/// socket onto typed channels, and returns the channel ends.
pub async fn connect_relay(
    url: &str,
    attempts: u32,
    backoff: Duration,
) -> Result<RelayLink, TransportError> {
    let socket = connect_with_retry(url, attempts, backoff).await?;
    let (mut ws_sink, mut ws_stream) = socket.split();

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ClientEvent>(CHANNEL_BUFFER);
    let (inbound_tx, inbound_rx) = mpsc::channel::<ServerEvent>(CHANNEL_BUFFER);

    // Writer: drain the session's events onto the socket in order
    tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            match event.to_json() {
                Ok(json) => {
                    if ws_sink.send(Message::Text(json.into())).await.is_err() {
                        tracing::debug!("Relay write failed, stopping writer");
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to encode event");
                }
            }
        }
        let _ = ws_sink.close().await;
    });

    // Reader: decode relay frames into server events
    tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => match ServerEvent::from_json(&text) {
                    Ok(event) => {
                        if inbound_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "Ignoring undecodable relay frame");
                    }
                },
                Ok(Message::Close(_)) => {
                    tracing::info!("Relay closed the connection");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Relay stream error");
                    break;
                }
            }
        }
        // Dropping inbound_tx closes the session's receiver
    });

    Ok(RelayLink {
        outbound: outbound_tx,
        inbound: inbound_rx,
    })
}

async fn connect_with_retry(
    url: &str,
    attempts: u32,
    backoff: Duration,
) -> Result<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>, TransportError> {
    let attempts = attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match connect_async(url).await {
            Ok((socket, _response)) => {
                tracing::info!(url, attempt, "Relay handshake established");
                return Ok(socket);
            }
            Err(e) if attempt < attempts => {
                tracing::warn!(url, attempt, error = %e, "Relay handshake failed, retrying");
                let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..250));
                tokio::time::sleep(backoff * attempt + jitter).await;
            }
            Err(e) => {
                tracing::warn!(url, attempts, error = %e, "Relay unreachable, giving up");
                return Err(TransportError::Unreachable { attempts, last: e });
            }
        }
    }
}
