//! Durable message store client
//!
//! The relay never calls the store; the client session does, alongside its
//! relay events. The trait seam keeps the session testable without a live
//! HTTP endpoint.

mod http;

pub use http::HttpMessageStore;

use async_trait::async_trait;
use homelink_core::{ConversationSummary, ListingId, NewMessage, StoredMessage, UserId};
use thiserror::Error;

/// Error talking to the durable store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("store returned an unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// The durable message log, as consumed by a client session
///
/// The store authenticates the caller from its bearer token, so the caller's
/// own identity never travels in these calls.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a new message; the store assigns the id and creation time
    async fn persist(&self, message: NewMessage) -> Result<StoredMessage, StoreError>;

    /// Conversation history with a peer, ascending by creation time
    async fn history(
        &self,
        peer: &UserId,
        listing: Option<&ListingId>,
    ) -> Result<Vec<StoredMessage>, StoreError>;

    /// Mark every unread message from `from` to the caller as read; returns
    /// the number of records updated
    async fn mark_read(&self, from: &UserId) -> Result<u64, StoreError>;

    /// The caller's conversation summaries
    async fn conversations(&self) -> Result<Vec<ConversationSummary>, StoreError>;
}
