//! Presence tracker
//!
//! Derives the online set from registry mutations and pushes it out: the
//! joining connection gets a full snapshot, everyone else gets incremental
//! deltas. Presence is eventually-stale by design; nothing is acknowledged
//! or retried, and the next mutation self-heals any missed update.

use crate::connection::{Connection, ConnectionRegistry};
use crate::protocol::ServerEvent;
use homelink_core::UserId;
use std::sync::Arc;

/// Broadcasts presence changes on every registry mutation
pub struct PresenceTracker {
    registry: Arc<ConnectionRegistry>,
}

impl PresenceTracker {
    /// Create a tracker over the shared registry
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Register a join: record the identity, snapshot to the joiner, delta to
    /// the rest
    pub async fn handle_join(&self, connection: &Arc<Connection>, user_id: UserId) {
        self.registry.register(user_id.clone(), connection.clone());

        // Full snapshot to the newly joined connection
        let snapshot = ServerEvent::PresenceSnapshot {
            online_user_ids: self.registry.online_users(),
        };
        if connection.send(snapshot).await.is_err() {
            tracing::warn!(
                connection_id = %connection.connection_id(),
                user_id = %user_id,
                "Joiner went away before the presence snapshot"
            );
            return;
        }

        // Incremental delta to everyone else
        self.registry
            .broadcast_except(
                connection.connection_id(),
                ServerEvent::PresenceDelta {
                    user_id: user_id.clone(),
                    online: true,
                },
            )
            .await;

        tracing::info!(
            user_id = %user_id,
            connection_id = %connection.connection_id(),
            online = self.registry.user_count(),
            "User joined"
        );
    }

    /// Handle a transport disconnect
    ///
    /// Broadcasts an offline delta only when the departing connection was
    /// still the current mapping for its user; a stale disconnect from a
    /// superseded connection changes nothing.
    pub async fn handle_disconnect(&self, connection: &Arc<Connection>) {
        let Some(user_id) = self.registry.unregister(connection) else {
            return;
        };

        self.registry
            .broadcast(ServerEvent::PresenceDelta {
                user_id: user_id.clone(),
                online: false,
            })
            .await;

        tracing::info!(
            user_id = %user_id,
            connection_id = %connection.connection_id(),
            online = self.registry.user_count(),
            "User disconnected"
        );
    }
}
