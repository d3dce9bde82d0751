//! Individual WebSocket connection
//!
//! Represents a single live connection and the identity it joined under.

use crate::protocol::ServerEvent;
use chrono::{DateTime, Utc};
use homelink_core::UserId;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Opaque handle identifying a single transport connection
///
/// Generated at socket accept, before any identity is known. Survives in the
/// registry so a stale disconnect from a superseded connection can be told
/// apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a fresh handle
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single live WebSocket connection
///
/// Events queued through `send` are drained by one writer task per socket,
/// which is what gives FIFO ordering per connection.
pub struct Connection {
    /// Transport handle
    connection_id: ConnectionId,

    /// Identity this connection joined under (None until Join)
    user_id: RwLock<Option<UserId>>,

    /// Channel to the connection's writer task
    sender: mpsc::Sender<ServerEvent>,

    /// Accept time
    connected_at: DateTime<Utc>,
}

impl Connection {
    /// Create a new connection around its outbound channel
    pub fn new(connection_id: ConnectionId, sender: mpsc::Sender<ServerEvent>) -> Arc<Self> {
        Arc::new(Self {
            connection_id,
            user_id: RwLock::new(None),
            sender,
            connected_at: Utc::now(),
        })
    }

    /// Get the transport handle
    #[must_use]
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Identity this connection joined under, if any
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id.read().clone()
    }

    /// Record the identity after a Join event
    pub fn set_user_id(&self, user_id: UserId) {
        *self.user_id.write() = Some(user_id);
    }

    /// Whether a Join has been processed on this connection
    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.user_id.read().is_some()
    }

    /// When the transport was accepted
    #[must_use]
    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Queue an event for this connection
    pub async fn send(
        &self,
        event: ServerEvent,
    ) -> Result<(), mpsc::error::SendError<ServerEvent>> {
        self.sender.send(event).await
    }

    /// Check if the writer side has gone away
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("connection_id", &self.connection_id)
            .field("user_id", &*self.user_id.read())
            .field("connected_at", &self.connected_at)
            .finish()
    }
}
