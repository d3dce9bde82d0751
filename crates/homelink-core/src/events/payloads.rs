//! Shared event payloads

use crate::value_objects::{ListingId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message content as relayed live between two connections
///
/// The `timestamp` is stamped by the relay at routing time. There is no
/// message id here: the durable store assigns one on its own write path,
/// which races with (and is independent of) live delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub from: UserId,

    pub to: UserId,

    #[serde(rename = "message")]
    pub body: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_id: Option<ListingId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_name: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl MessagePayload {
    /// Body preview for log lines, bounded to keep logs readable
    #[must_use]
    pub fn body_preview(&self) -> &str {
        let end = self
            .body
            .char_indices()
            .nth(50)
            .map_or(self.body.len(), |(i, _)| i);
        &self.body[..end]
    }
}
