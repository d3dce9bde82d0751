//! Delivery router
//!
//! Single dispatch entry point for every decoded client event. Resolves the
//! target through the connection registry and forwards; an unreachable
//! recipient is a silent no-op, not an error — the sender's client persists
//! the message to the durable store independently, and the recipient catches
//! up from there on its next history fetch.
//!
//! The router queues nothing, retries nothing, and acknowledges nothing
//! beyond the unconditional `MessageSent` echo to the sender.

use crate::connection::{Connection, ConnectionRegistry};
use crate::presence::PresenceTracker;
use crate::protocol::{ClientEvent, CloseCode, MessagePayload, ServerEvent};
use chrono::Utc;
use homelink_core::UserId;
use std::sync::Arc;
use thiserror::Error;

/// Router error type
#[derive(Debug, Error)]
pub enum RouterError {
    /// The originating connection's channel is gone; the socket is dead
    #[error("originating connection closed")]
    OriginClosed,
}

impl RouterError {
    /// Convert to a close code
    #[must_use]
    pub fn to_close_code(&self) -> CloseCode {
        match self {
            Self::OriginClosed => CloseCode::UnknownError,
        }
    }
}

/// Router result type
pub type RouterResult<T> = Result<T, RouterError>;

/// Routes relay events between connections
pub struct EventRouter {
    registry: Arc<ConnectionRegistry>,
    presence: PresenceTracker,
}

impl EventRouter {
    /// Create a router over the shared registry
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        let presence = PresenceTracker::new(registry.clone());
        Self { registry, presence }
    }

    /// Handle one decoded client event
    pub async fn handle(
        &self,
        connection: &Arc<Connection>,
        event: ClientEvent,
    ) -> RouterResult<()> {
        tracing::trace!(
            connection_id = %connection.connection_id(),
            event = event.name(),
            "Handling event"
        );

        match event {
            ClientEvent::Join { user_id } => {
                self.presence.handle_join(connection, user_id).await;
                Ok(())
            }
            ClientEvent::MessageSend {
                from,
                to,
                body,
                listing_id,
                listing_name,
            } => {
                let payload = MessagePayload {
                    from,
                    to,
                    body,
                    listing_id,
                    listing_name,
                    timestamp: Utc::now(),
                };
                self.route_message(connection, payload).await
            }
            ClientEvent::TypingStart { from, to } => {
                self.forward(&to, ServerEvent::Typing { from, typing: true })
                    .await;
                Ok(())
            }
            ClientEvent::TypingStop { from, to } => {
                self.forward(&to, ServerEvent::Typing { from, typing: false })
                    .await;
                Ok(())
            }
            ClientEvent::ReadReceipt {
                from,
                to,
                message_id,
            } => {
                self.forward(&to, ServerEvent::ReadReceipt { from, message_id })
                    .await;
                Ok(())
            }
        }
    }

    /// Handle a transport disconnect (explicit close or timeout)
    pub async fn handle_disconnect(&self, connection: &Arc<Connection>) {
        self.presence.handle_disconnect(connection).await;
    }

    /// Relay a chat message: live copy to the recipient when reachable, echo
    /// to the sender always
    async fn route_message(
        &self,
        origin: &Arc<Connection>,
        payload: MessagePayload,
    ) -> RouterResult<()> {
        tracing::debug!(
            from = %payload.from,
            to = %payload.to,
            body = payload.body_preview(),
            "Message send"
        );

        match self.registry.lookup(&payload.to) {
            Some(recipient) => {
                // A closed recipient channel means the socket is on its way
                // out; treat it the same as offline.
                if recipient
                    .send(ServerEvent::MessageReceive(payload.clone()))
                    .await
                    .is_ok()
                {
                    tracing::debug!(to = %payload.to, "Message delivered");
                } else {
                    tracing::debug!(to = %payload.to, "Recipient connection closing, message dropped");
                }
            }
            None => {
                tracing::debug!(to = %payload.to, "Recipient offline, message dropped");
            }
        }

        // Echo regardless of whether the recipient was reachable, so the
        // sender's UI can render optimistically.
        origin
            .send(ServerEvent::MessageSent(payload))
            .await
            .map_err(|_| RouterError::OriginClosed)
    }

    /// Forward a signal to a user's current connection; silent no-op when
    /// offline
    async fn forward(&self, to: &UserId, event: ServerEvent) {
        if let Some(target) = self.registry.lookup(to) {
            if target.send(event).await.is_err() {
                tracing::trace!(to = %to, "Signal dropped, connection closing");
            }
        }
    }
}
