//! Relay-to-client events

use super::{EventDecodeError, MessagePayload};
use crate::value_objects::{MessageId, UserId};
use serde::{Deserialize, Serialize};

/// Events the relay pushes to connected clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ServerEvent {
    /// Full online set, sent to a connection right after its join
    #[serde(rename = "presence:snapshot", rename_all = "camelCase")]
    PresenceSnapshot { online_user_ids: Vec<UserId> },

    /// Incremental presence change, broadcast to every connection
    #[serde(rename = "presence:delta", rename_all = "camelCase")]
    PresenceDelta { user_id: UserId, online: bool },

    /// Echo to the sender, emitted whether or not the recipient was reachable
    #[serde(rename = "message:sent")]
    MessageSent(MessagePayload),

    /// Live copy delivered to the recipient
    #[serde(rename = "message:receive")]
    MessageReceive(MessagePayload),

    /// Peer composing state
    #[serde(rename = "typing:indicator")]
    Typing { from: UserId, typing: bool },

    /// Read confirmation routed back to the message author; `from` is the
    /// reader
    #[serde(rename = "message:read", rename_all = "camelCase")]
    ReadReceipt { from: UserId, message_id: MessageId },
}

impl ServerEvent {
    /// Wire name of the event, for log lines
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PresenceSnapshot { .. } => "presence:snapshot",
            Self::PresenceDelta { .. } => "presence:delta",
            Self::MessageSent(_) => "message:sent",
            Self::MessageReceive(_) => "message:receive",
            Self::Typing { .. } => "typing:indicator",
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
