//! Message entities
//!
//! Wire-compatible with the marketplace REST API: field names follow its
//! camelCase JSON, the record id arrives as `_id`, and the message text
//! travels in a field named `message`.

use crate::value_objects::{ListingId, MessageId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message as recorded by the durable store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    /// Store-assigned record id
    #[serde(rename = "_id", alias = "id")]
    pub id: MessageId,

    /// Sender identity
    pub from: UserId,

    /// Recipient identity
    pub to: UserId,

    /// Message text
    #[serde(rename = "message")]
    pub body: String,

    /// Listing the conversation is about, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_id: Option<ListingId>,

    /// Human-readable listing name, denormalized for display
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_name: Option<String>,

    /// Whether the recipient has read the message
    #[serde(default)]
    pub read: bool,

    /// When the message was marked read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,

    /// Store-side creation time; history ordering key
    pub created_at: DateTime<Utc>,
}

/// Write-side payload for persisting a new message
///
/// The store derives the sender from the bearer token, so only the recipient
/// and content travel in the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub to: UserId,

    #[serde(rename = "message")]
    pub body: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_id: Option<ListingId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_name: Option<String>,
}
