//! Client-to-relay events
//!
//! One tagged union instead of one callback per event name: every inbound
//! frame decodes to a `ClientEvent` and flows through a single dispatch
//! entry point on the relay side.

use super::EventDecodeError;
use crate::value_objects::{ListingId, MessageId, UserId};
use serde::{Deserialize, Serialize};

/// Events a connected client may send over the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ClientEvent {
    /// Register the connection under a verified user identity
    #[serde(rename = "join", rename_all = "camelCase")]
    Join { user_id: UserId },

    /// Deliver a chat message to another user
    #[serde(rename = "message:send", rename_all = "camelCase")]
    MessageSend {
        from: UserId,
        to: UserId,
        #[serde(rename = "message")]
        body: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        listing_id: Option<ListingId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        listing_name: Option<String>,
    },

    /// Sender started composing
    #[serde(rename = "typing:start")]
    TypingStart { from: UserId, to: UserId },

    /// Sender stopped composing
    #[serde(rename = "typing:stop")]
    TypingStop { from: UserId, to: UserId },

    /// Reader confirms a message was displayed; `from` is the reader,
    /// `to` the message author the receipt is routed back to
    #[serde(rename = "message:read", rename_all = "camelCase")]
    ReadReceipt {
        from: UserId,
        to: UserId,
        message_id: MessageId,
    },
}

impl ClientEvent {
    /// Wire name of the event, for log lines
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::MessageSend { .. } => "message:send",
            Self::TypingStart { .. } => "typing:start",
            Self::TypingStop { .. } => "typing:stop",
            Self::ReadReceipt { .. } => "message:read",
        }
    }

    /// Serialize to a JSON text frame
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a JSON text frame
    pub fn from_json(json: &str) -> Result<Self, EventDecodeError> {
        Ok(serde_json::from_str(json)?)
    }
}
