//! WebSocket handler
//!
//! Accepts upgraded connections, decodes frames into client events, and
//! drives the router. One reader task and one writer task per socket; the
//! writer drains the connection's channel in order, which is what gives FIFO
//! delivery per transport pair.

use crate::connection::{Connection, ConnectionId};
use crate::protocol::{ClientEvent, CloseCode, ServerEvent};
use crate::server::RelayState;
use axum::{
    extract::{ws::Message, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Channel buffer size for outgoing events
const EVENT_BUFFER_SIZE: usize = 100;

/// WebSocket relay handler
pub async fn relay_handler(
    State(state): State<RelayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: RelayState, socket: axum::extract::ws::WebSocket) {
    let connection_id = ConnectionId::generate();

    // Create the outgoing event channel and register the socket
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(EVENT_BUFFER_SIZE);
    let connection = Connection::new(connection_id, tx);
    state.registry().attach(connection.clone());

    tracing::info!(connection_id = %connection_id, "WebSocket connection established");

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Writer task: drain the channel onto the socket in order
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event.to_json() {
                Ok(json) => {
                    if ws_sink.send(Message::Text(json.into())).await.is_err() {
                        tracing::debug!(
                            connection_id = %connection_id,
                            "Failed to write to WebSocket"
                        );
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        connection_id = %connection_id,
                        error = %e,
                        "Failed to encode event"
                    );
                }
            }
        }

        // Close the socket once the channel is gone
        let _ = ws_sink.close().await;
    });

    // Reader task: decode frames and dispatch through the router
    let state_recv = state.clone();
    let connection_recv = connection.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if let Err(close_code) =
                        handle_text_frame(&state_recv, &connection_recv, &text).await
                    {
                        return Some(close_code);
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        "Binary frames not supported"
                    );
                    return Some(CloseCode::DecodeError);
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    // Handled at the transport level
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(connection_id = %connection_id, "Client closed connection");
                    return None;
                }
                Err(e) => {
                    tracing::warn!(
                        connection_id = %connection_id,
                        error = %e,
                        "WebSocket error"
                    );
                    return Some(CloseCode::UnknownError);
                }
            }
        }
        None
    });

    // Either side ending tears the connection down
    tokio::select! {
        result = recv_task => {
            if let Ok(Some(close_code)) = result {
                tracing::debug!(
                    connection_id = %connection_id,
                    close_code = %close_code,
                    "Connection closing"
                );
            }
        }
        _ = send_task => {
            tracing::debug!(connection_id = %connection_id, "Writer task ended");
        }
    }

    cleanup_connection(&state, &connection).await;
}

/// Decode and dispatch a text frame
async fn handle_text_frame(
    state: &RelayState,
    connection: &Arc<Connection>,
    text: &str,
) -> Result<(), CloseCode> {
    let event = match ClientEvent::from_json(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(
                connection_id = %connection.connection_id(),
                error = %e,
                "Failed to decode frame"
            );
            return Err(CloseCode::DecodeError);
        }
    };

    state.router().handle(connection, event).await.map_err(|e| {
        tracing::warn!(
            connection_id = %connection.connection_id(),
            error = %e,
            "Router error"
        );
        e.to_close_code()
    })
}

/// Clean up a connection on disconnect
///
/// Unregistering is synchronous and unconditional; there is no grace window
/// for a quick reconnect, so observers may see an online/offline/online
/// flicker. Accepted trade-off.
async fn cleanup_connection(state: &RelayState, connection: &Arc<Connection>) {
    state.router().handle_disconnect(connection).await;
    state.registry().detach(connection.connection_id());

    tracing::info!(
        connection_id = %connection.connection_id(),
        remaining = state.registry().connection_count(),
        "Connection cleaned up"
    );
}
