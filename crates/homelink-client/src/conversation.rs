//! In-memory conversation view
//!
//! Merges three sources into one message list: history fetched from the
//! durable store, live relay events, and the session's own provisional
//! sends. Live events carry no store id, so deduplication keys on
//! `(sender, timestamp, body)`.

use chrono::{DateTime, Utc};
use homelink_core::{ListingId, MessageId, MessagePayload, StoredMessage, UserId};

/// Where an outbound message stands on its two delivery paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    /// Provisional: emitted to the relay, store write still in flight
    Sending,
    /// The relay echoed `message:sent`; durable state unknown
    Sent,
    /// The durable store acknowledged the write
    Persisted,
    /// The store write failed; the message may have been seen live but was
    /// never durably recorded
    Failed,
}

/// One row of the conversation view
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// Store id, once known
    pub id: Option<MessageId>,
    pub from: UserId,
    pub to: UserId,
    pub body: String,
    pub listing_id: Option<ListingId>,
    pub listing_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub delivery: DeliveryState,
    /// For outbound rows: the peer confirmed reading. For inbound rows: this
    /// session displayed the message.
    pub read: bool,
}

impl ChatMessage {
    /// Build a row from a durable store record
    #[must_use]
    pub fn from_stored(stored: StoredMessage) -> Self {
        Self {
            id: Some(stored.id),
            from: stored.from,
            to: stored.to,
            body: stored.body,
            listing_id: stored.listing_id,
            listing_name: stored.listing_name,
            timestamp: stored.created_at,
            delivery: DeliveryState::Persisted,
            read: stored.read,
        }
    }

    /// Build a row from a live relay payload
    #[must_use]
    pub fn from_payload(payload: MessagePayload) -> Self {
        Self {
            id: None,
            from: payload.from,
            to: payload.to,
            body: payload.body,
            listing_id: payload.listing_id,
            listing_name: payload.listing_name,
            timestamp: payload.timestamp,
            delivery: DeliveryState::Sent,
            read: false,
        }
    }
}

/// The message list for one conversation (two users, optional listing scope)
#[derive(Debug)]
pub struct ConversationView {
    me: UserId,
    peer: UserId,
    messages: Vec<ChatMessage>,
}

impl ConversationView {
    /// Create an empty view
    #[must_use]
    pub fn new(me: UserId, peer: UserId) -> Self {
        Self {
            me,
            peer,
            messages: Vec::new(),
        }
    }

    /// Replace the view with history fetched from the durable store
    pub fn load_history(&mut self, history: Vec<StoredMessage>) {
        self.messages = history.into_iter().map(ChatMessage::from_stored).collect();
    }

    /// All rows, in arrival order
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Append a provisional outbound row; returns its index for later
    /// reconciliation
    pub fn begin_send(
        &mut self,
        body: String,
        listing_id: Option<ListingId>,
        listing_name: Option<String>,
    ) -> usize {
        self.messages.push(ChatMessage {
            id: None,
            from: self.me.clone(),
            to: self.peer.clone(),
            body,
            listing_id,
            listing_name,
            timestamp: Utc::now(),
            delivery: DeliveryState::Sending,
            read: false,
        });
        self.messages.len() - 1
    }

    /// Reconcile the relay's `message:sent` echo against the oldest matching
    /// provisional row
    pub fn apply_echo(&mut self, payload: &MessagePayload) {
        if let Some(row) = self.messages.iter_mut().find(|m| {
            m.delivery == DeliveryState::Sending && m.from == payload.from && m.body == payload.body
        }) {
            row.timestamp = payload.timestamp;
            row.delivery = DeliveryState::Sent;
        }
    }

    /// Reconcile the durable store's persist response
    pub fn apply_persisted(&mut self, index: usize, stored: StoredMessage) {
        if let Some(row) = self.messages.get_mut(index) {
            row.id = Some(stored.id);
            row.delivery = DeliveryState::Persisted;
        }
    }

    /// Record that the store write for a provisional row failed
    pub fn mark_failed(&mut self, index: usize) {
        if let Some(row) = self.messages.get_mut(index) {
            row.delivery = DeliveryState::Failed;
        }
    }

    /// Merge an inbound live message; returns false when the row was already
    /// present (dedup key: sender + timestamp + body)
    pub fn merge_live(&mut self, payload: MessagePayload) -> bool {
        let duplicate = self.messages.iter().any(|m| {
            m.from == payload.from && m.timestamp == payload.timestamp && m.body == payload.body
        });
        if duplicate {
            return false;
        }
        self.messages.push(ChatMessage::from_payload(payload));
        true
    }

    /// Apply a read receipt from the peer
    ///
    /// Marks the matching outbound row when the id is known locally;
    /// otherwise falls back to marking every outbound row read, matching the
    /// store's own last-write-wins `markRead` discipline. Returns the number
    /// of rows updated.
    pub fn apply_read_receipt(&mut self, message_id: &MessageId) -> usize {
        if let Some(row) = self
            .messages
            .iter_mut()
            .find(|m| m.id.as_ref() == Some(message_id))
        {
            if row.read {
                return 0;
            }
            row.read = true;
            return 1;
        }

        let mut updated = 0;
        for row in self
            .messages
            .iter_mut()
            .filter(|m| m.from == self.me && !m.read)
        {
            row.read = true;
            updated += 1;
        }
        updated
    }

    /// Inbound rows not yet displayed, with their store ids when known
    #[must_use]
    pub fn unread_inbound(&self) -> Vec<(Option<MessageId>, usize)> {
        self.messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.from == self.peer && !m.read)
            .map(|(i, m)| (m.id.clone(), i))
            .collect()
    }

    /// Mark an inbound row as displayed
    pub fn mark_displayed(&mut self, index: usize) {
        if let Some(row) = self.messages.get_mut(index) {
            row.read = true;
        }
    }
}
