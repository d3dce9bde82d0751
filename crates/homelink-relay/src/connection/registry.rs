//! Connection registry
//!
//! Single source of truth for "is this user reachable right now". Backed by
//! `DashMap`; every mutation is a single atomic map operation, and no guard
//! is ever held across an await.

use super::{Connection, ConnectionId};
use crate::protocol::ServerEvent;
use dashmap::DashMap;
use homelink_core::UserId;
use std::sync::Arc;

/// Maps user identities to their currently active connection
///
/// Invariant: at most one entry per `UserId`. A second join for the same
/// identity silently replaces the prior entry (last-connection-wins); the
/// superseded connection is not notified.
pub struct ConnectionRegistry {
    /// Every accepted socket, joined or not
    sockets: DashMap<ConnectionId, Arc<Connection>>,

    /// Current connection per joined user
    entries: DashMap<UserId, Arc<Connection>>,
}

impl ConnectionRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            sockets: DashMap::new(),
            entries: DashMap::new(),
        }
    }

    /// Create a new registry wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Track a freshly accepted socket
    pub fn attach(&self, connection: Arc<Connection>) {
        tracing::debug!(connection_id = %connection.connection_id(), "Connection attached");
        self.sockets.insert(connection.connection_id(), connection);
    }

    /// Forget a socket; no-op if already gone
    pub fn detach(&self, connection_id: ConnectionId) {
        if self.sockets.remove(&connection_id).is_some() {
            tracing::debug!(connection_id = %connection_id, "Connection detached");
        }
    }

    /// Register a user identity on a connection
    ///
    /// Unconditionally overwrites any existing mapping for `user_id` and
    /// returns the replaced connection, if any. Idempotent: re-registering
    /// the same connection is harmless.
    pub fn register(&self, user_id: UserId, connection: Arc<Connection>) -> Option<Arc<Connection>> {
        connection.set_user_id(user_id.clone());
        let replaced = self.entries.insert(user_id.clone(), connection);

        if let Some(prev) = &replaced {
            tracing::debug!(
                user_id = %user_id,
                superseded = %prev.connection_id(),
                "Registration replaced a prior connection"
            );
        }

        replaced
    }

    /// Remove the user mapping held by a departing connection
    ///
    /// Only removes the entry when the departing connection is still the
    /// *current* mapping for its user; a stale disconnect from a superseded
    /// connection must not mark a still-connected user offline. Returns the
    /// user id when the user actually went offline.
    pub fn unregister(&self, connection: &Connection) -> Option<UserId> {
        let user_id = connection.user_id()?;
        let departing = connection.connection_id();

        let removed = self
            .entries
            .remove_if(&user_id, |_, current| current.connection_id() == departing);

        removed.map(|(user_id, _)| user_id)
    }

    /// Current connection for a user, if any
    #[must_use]
    pub fn lookup(&self, user_id: &UserId) -> Option<Arc<Connection>> {
        self.entries.get(user_id).map(|r| r.clone())
    }

    /// Whether a user currently holds a live connection
    #[must_use]
    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.entries.contains_key(user_id)
    }

    /// Snapshot of the online set
    #[must_use]
    pub fn online_users(&self) -> Vec<UserId> {
        self.entries.iter().map(|r| r.key().clone()).collect()
    }

    /// Number of accepted sockets
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.sockets.len()
    }

    /// Number of joined users
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.entries.len()
    }

    /// Send an event to every accepted socket
    ///
    /// Connections are snapshotted before sending so no map guard is held
    /// across an await.
    pub async fn broadcast(&self, event: ServerEvent) -> usize {
        self.broadcast_filtered(event, None).await
    }

    /// Send an event to every accepted socket except one
    pub async fn broadcast_except(&self, exclude: ConnectionId, event: ServerEvent) -> usize {
        self.broadcast_filtered(event, Some(exclude)).await
    }

    async fn broadcast_filtered(&self, event: ServerEvent, exclude: Option<ConnectionId>) -> usize {
        let targets: Vec<Arc<Connection>> = self
            .sockets
            .iter()
            .filter(|r| Some(r.connection_id()) != exclude)
            .map(|r| r.value().clone())
            .collect();

        let mut sent = 0;
        for conn in targets {
            if conn.send(event.clone()).await.is_ok() {
                sent += 1;
            }
        }

        tracing::trace!(event = event.name(), sent, "Broadcast");
        sent
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("sockets", &self.sockets.len())
            .field("users", &self.entries.len())
            .finish()
    }
}
