//! Conversation grouping
//!
//! A conversation is not a stored entity in this core; it is the grouping key
//! the client session uses when fetching history from the durable store, plus
//! the summary rows the store's conversations endpoint returns.

use crate::entities::StoredMessage;
use crate::value_objects::{ListingId, UserId};
use serde::{Deserialize, Serialize};

/// Logical key identifying a conversation between two users, optionally
/// scoped to a listing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    a: UserId,
    b: UserId,
    listing: Option<ListingId>,
}

impl ConversationKey {
    /// Build a canonical key: the participant pair is order-insensitive, so
    /// the same two users always map to the same key.
    pub fn new(one: UserId, other: UserId, listing: Option<ListingId>) -> Self {
        let (a, b) = if one <= other { (one, other) } else { (other, one) };
        Self { a, b, listing }
    }

    /// The two participants, in canonical order
    #[must_use]
    pub fn participants(&self) -> (&UserId, &UserId) {
        (&self.a, &self.b)
    }

    /// The listing scope, if any
    #[must_use]
    pub fn listing(&self) -> Option<&ListingId> {
        self.listing.as_ref()
    }

    /// Given one participant, return the other
    #[must_use]
    pub fn peer_of(&self, user: &UserId) -> Option<&UserId> {
        if &self.a == user {
            Some(&self.b)
        } else if &self.b == user {
            Some(&self.a)
        } else {
            None
        }
    }
}

/// One row of the store's conversations listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// The other participant
    pub peer_id: UserId,

    /// Display name of the peer, when the store joins it in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_id: Option<ListingId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_name: Option<String>,

    /// Most recent message in the conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<StoredMessage>,

    /// Messages addressed to the caller that are still unread
    #[serde(default)]
    pub unread_count: u64,
}
