//! Chat session state machine
//!
//! One session per open chat view. Drives both delivery paths: live relay
//! events over the WebSocket, and durable persistence over the store's REST
//! API. The two paths race by design; the session reconciles them against a
//! single conversation view and surfaces the cases where they disagree.
//!
//! States: `Disconnected → Connecting → Joined → (ChattingIdle ⇄
//! ChattingTyping) → Closed`. A closed session never reconnects.

use crate::conversation::ConversationView;
use crate::store::{MessageStore, StoreError};
use homelink_core::{ClientEvent, ListingId, NewMessage, ServerEvent, UserId};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// How long after the last keystroke the typing indicator auto-stops
const TYPING_IDLE: Duration = Duration::from_secs(1);

/// Observable session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Joined,
    ChattingIdle,
    ChattingTyping,
    Closed,
}

/// Internal lifecycle phase; the typing flip is derived separately
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Disconnected,
    Connecting,
    Joined,
    Chatting,
    Closed,
}

/// Session error type
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session is not in a state that allows this operation
    #[error("session is not connected")]
    NotConnected,

    /// The relay's outbound channel is gone; the transport has died
    #[error("relay connection lost")]
    RelayGone,

    /// Durable store failure; for sends, the live emit already happened and
    /// the affected row is marked `Failed`
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Our verified identity, as issued by the identity provider
    pub user_id: UserId,
    /// The other participant
    pub peer_id: UserId,
    /// Listing scope, when the conversation is about a specific property
    pub listing_id: Option<ListingId>,
    pub listing_name: Option<String>,
    /// Typing idle countdown
    pub typing_idle: Duration,
}

impl SessionConfig {
    /// Configuration for an unscoped conversation
    #[must_use]
    pub fn new(user_id: UserId, peer_id: UserId) -> Self {
        Self {
            user_id,
            peer_id,
            listing_id: None,
            listing_name: None,
            typing_idle: TYPING_IDLE,
        }
    }

    /// Scope the conversation to a listing
    #[must_use]
    pub fn with_listing(mut self, listing_id: ListingId, listing_name: impl Into<String>) -> Self {
        self.listing_id = Some(listing_id);
        self.listing_name = Some(listing_name.into());
        self
    }
}

/// The per-tab chat session
pub struct ChatSession {
    config: SessionConfig,
    phase: Phase,
    outbound: mpsc::Sender<ClientEvent>,
    store: Arc<dyn MessageStore>,
    view: ConversationView,
    online: HashSet<UserId>,
    peer_typing: bool,
    visible: bool,
    typing: Arc<AtomicBool>,
    typing_task: Option<JoinHandle<()>>,
}

impl ChatSession {
    /// Create a session over an established outbound channel
    ///
    /// The channel is usually the sender half of [`crate::transport::RelayLink`],
    /// but any channel works, which keeps the state machine testable without
    /// a live transport.
    pub fn new(
        config: SessionConfig,
        store: Arc<dyn MessageStore>,
        outbound: mpsc::Sender<ClientEvent>,
    ) -> Self {
        let view = ConversationView::new(config.user_id.clone(), config.peer_id.clone());
        Self {
            config,
            phase: Phase::Disconnected,
            outbound,
            store,
            view,
            online: HashSet::new(),
            peer_typing: false,
            visible: true,
            typing: Arc::new(AtomicBool::new(false)),
            typing_task: None,
        }
    }

    /// Current observable state
    #[must_use]
    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::Disconnected => SessionState::Disconnected,
            Phase::Connecting => SessionState::Connecting,
            Phase::Joined => SessionState::Joined,
            Phase::Chatting => {
                if self.typing.load(Ordering::SeqCst) {
                    SessionState::ChattingTyping
                } else {
                    SessionState::ChattingIdle
                }
            }
            Phase::Closed => SessionState::Closed,
        }
    }

    /// The conversation view
    #[must_use]
    pub fn conversation(&self) -> &ConversationView {
        &self.view
    }

    /// Whether the peer currently holds a live connection
    #[must_use]
    pub fn is_peer_online(&self) -> bool {
        self.online.contains(&self.config.peer_id)
    }

    /// Whether the peer is composing
    #[must_use]
    pub fn peer_typing(&self) -> bool {
        self.peer_typing
    }

    /// Transport handshake initiated
    pub fn begin_connect(&mut self) {
        if self.phase == Phase::Disconnected {
            self.phase = Phase::Connecting;
        }
    }

    /// Transport handshake exhausted its retries; the UI shows the
    /// connectivity banner and the rest of the application carries on
    pub fn connect_failed(&mut self) {
        if self.phase == Phase::Connecting {
            self.phase = Phase::Disconnected;
        }
    }

    /// Transport handshake succeeded: join under our identity and backfill
    /// history from the durable store
    pub async fn joined(&mut self) -> Result<(), SessionError> {
        self.send_event(ClientEvent::Join {
            user_id: self.config.user_id.clone(),
        })
        .await?;
        self.phase = Phase::Joined;

        let history = self
            .store
            .history(&self.config.peer_id, self.config.listing_id.as_ref())
            .await?;
        self.view.load_history(history);
        self.phase = Phase::Chatting;

        if self.visible {
            self.mark_displayed().await?;
        }

        Ok(())
    }

    /// Show or hide the conversation; becoming visible flushes read state
    pub async fn set_visible(&mut self, visible: bool) -> Result<(), SessionError> {
        self.visible = visible;
        if visible && self.phase == Phase::Chatting {
            self.mark_displayed().await?;
        }
        Ok(())
    }

    /// Send a chat message down both paths
    ///
    /// The live emit and the durable write are independent: the relay will
    /// echo `message:sent` whether or not persistence succeeds, so a failed
    /// store write leaves a row that was seen live but never durably
    /// recorded. That row is marked `Failed` and the error surfaced here.
    pub async fn send_message(&mut self, body: impl Into<String>) -> Result<(), SessionError> {
        if self.phase != Phase::Chatting {
            return Err(SessionError::NotConnected);
        }
        let body = body.into();

        let index = self.view.begin_send(
            body.clone(),
            self.config.listing_id.clone(),
            self.config.listing_name.clone(),
        );

        // Live path
        self.send_event(ClientEvent::MessageSend {
            from: self.config.user_id.clone(),
            to: self.config.peer_id.clone(),
            body: body.clone(),
            listing_id: self.config.listing_id.clone(),
            listing_name: self.config.listing_name.clone(),
        })
        .await?;

        // Durable path
        match self
            .store
            .persist(NewMessage {
                to: self.config.peer_id.clone(),
                body,
                listing_id: self.config.listing_id.clone(),
                listing_name: self.config.listing_name.clone(),
            })
            .await
        {
            Ok(stored) => {
                self.view.apply_persisted(index, stored);
                self.stop_typing().await?;
                Ok(())
            }
            Err(e) => {
                self.view.mark_failed(index);
                Err(e.into())
            }
        }
    }

    /// A keystroke landed in the input field
    ///
    /// Emits `typing:start` and (re)arms the idle countdown; one second
    /// without further input auto-emits `typing:stop`. The relay does no
    /// debouncing of its own.
    pub async fn input_changed(&mut self) -> Result<(), SessionError> {
        if self.phase != Phase::Chatting {
            return Err(SessionError::NotConnected);
        }

        self.typing.store(true, Ordering::SeqCst);
        self.send_event(ClientEvent::TypingStart {
            from: self.config.user_id.clone(),
            to: self.config.peer_id.clone(),
        })
        .await?;

        if let Some(task) = self.typing_task.take() {
            task.abort();
        }

        let outbound = self.outbound.clone();
        let typing = self.typing.clone();
        let from = self.config.user_id.clone();
        let to = self.config.peer_id.clone();
        let idle = self.config.typing_idle;
        self.typing_task = Some(tokio::spawn(async move {
            tokio::time::sleep(idle).await;
            typing.store(false, Ordering::SeqCst);
            let _ = outbound.send(ClientEvent::TypingStop { from, to }).await;
        }));

        Ok(())
    }

    /// Handle one inbound relay event
    pub async fn handle_event(&mut self, event: ServerEvent) -> Result<(), SessionError> {
        match event {
            ServerEvent::PresenceSnapshot { online_user_ids } => {
                self.online = online_user_ids.into_iter().collect();
            }
            ServerEvent::PresenceDelta { user_id, online } => {
                if online {
                    self.online.insert(user_id);
                } else {
                    self.online.remove(&user_id);
                }
            }
            ServerEvent::MessageReceive(payload) => {
                if payload.from == self.config.peer_id
                    && self.view.merge_live(payload)
                    && self.visible
                {
                    self.mark_displayed().await?;
                }
            }
            ServerEvent::MessageSent(payload) => {
                self.view.apply_echo(&payload);
            }
            ServerEvent::Typing { from, typing } => {
                if from == self.config.peer_id {
                    self.peer_typing = typing;
                }
            }
            ServerEvent::ReadReceipt { from, message_id } => {
                // Local view only; the store's own markRead result is a
                // separate concern the peer already handled REST-side.
                if from == self.config.peer_id {
                    self.view.apply_read_receipt(&message_id);
                }
            }
        }
        Ok(())
    }

    /// Close the session; terminal, no automatic reconnect
    pub fn close(&mut self) {
        if let Some(task) = self.typing_task.take() {
            task.abort();
        }
        self.typing.store(false, Ordering::SeqCst);
        self.phase = Phase::Closed;
    }

    /// Flush read state for displayed messages
    ///
    /// Emits a `message:read` receipt for each unread inbound row whose
    /// store id is known (live rows have none until the next history fetch),
    /// then issues the store-side markRead. A store failure here is logged
    /// and swallowed; read state self-heals on the next fetch.
    async fn mark_displayed(&mut self) -> Result<(), SessionError> {
        let unread = self.view.unread_inbound();
        if unread.is_empty() {
            return Ok(());
        }

        for (id, index) in unread {
            if let Some(message_id) = id {
                self.send_event(ClientEvent::ReadReceipt {
                    from: self.config.user_id.clone(),
                    to: self.config.peer_id.clone(),
                    message_id,
                })
                .await?;
            }
            self.view.mark_displayed(index);
        }

        if let Err(e) = self.store.mark_read(&self.config.peer_id).await {
            tracing::warn!(peer = %self.config.peer_id, error = %e, "Store markRead failed");
        }

        Ok(())
    }

    /// Cancel the idle countdown and emit `typing:stop` if we were typing
    async fn stop_typing(&mut self) -> Result<(), SessionError> {
        if let Some(task) = self.typing_task.take() {
            task.abort();
        }
        if self.typing.swap(false, Ordering::SeqCst) {
            self.send_event(ClientEvent::TypingStop {
                from: self.config.user_id.clone(),
                to: self.config.peer_id.clone(),
            })
            .await?;
        }
        Ok(())
    }

    async fn send_event(&self, event: ClientEvent) -> Result<(), SessionError> {
        self.outbound
            .send(event)
            .await
            .map_err(|_| SessionError::RelayGone)
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        if let Some(task) = self.typing_task.take() {
            task.abort();
        }
    }
}
