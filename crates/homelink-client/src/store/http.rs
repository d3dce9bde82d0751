//! HTTP implementation of the message store
//!
//! Talks to the marketplace REST API with bearer-token auth. Response bodies
//! arrive wrapped in small envelopes (`{"messages": [...]}` and friends).

use super::{MessageStore, StoreError};
use async_trait::async_trait;
use homelink_common::StoreConfig;
use homelink_core::{ConversationSummary, ListingId, NewMessage, StoredMessage, UserId};
use serde::Deserialize;
use std::time::Duration;

/// REST-backed durable message store
pub struct HttpMessageStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Deserialize)]
struct MessageEnvelope {
    message: StoredMessage,
}

#[derive(Deserialize)]
struct HistoryEnvelope {
    messages: Vec<StoredMessage>,
}

#[derive(Deserialize)]
struct ReadEnvelope {
    count: u64,
}

#[derive(Deserialize)]
struct ConversationsEnvelope {
    conversations: Vec<ConversationSummary>,
}

impl HttpMessageStore {
    /// Create a store client from configuration and an access token
    pub fn new(config: &StoreConfig, token: impl Into<String>) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

#[async_trait]
impl MessageStore for HttpMessageStore {
    async fn persist(&self, message: NewMessage) -> Result<StoredMessage, StoreError> {
        let envelope: MessageEnvelope = self
            .client
            .post(self.url("/api/chat/messages"))
            .header("Authorization", self.bearer())
            .json(&message)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(envelope.message)
    }

    async fn history(
        &self,
        peer: &UserId,
        listing: Option<&ListingId>,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let mut request = self
            .client
            .get(self.url("/api/chat/messages"))
            .header("Authorization", self.bearer())
            .query(&[("userId", peer.as_str())]);

        if let Some(listing_id) = listing {
            request = request.query(&[("listingId", listing_id.as_str())]);
        }

        let envelope: HistoryEnvelope = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(envelope.messages)
    }

    async fn mark_read(&self, from: &UserId) -> Result<u64, StoreError> {
        let envelope: ReadEnvelope = self
            .client
            .patch(self.url("/api/chat/read"))
            .header("Authorization", self.bearer())
            .query(&[("from", from.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(envelope.count)
    }

    async fn conversations(&self) -> Result<Vec<ConversationSummary>, StoreError> {
        let envelope: ConversationsEnvelope = self
            .client
            .get(self.url("/api/chat/conversations"))
            .header("Authorization", self.bearer())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(envelope.conversations)
    }
}

impl std::fmt::Debug for HttpMessageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMessageStore")
            .field("base_url", &self.base_url)
            .finish()
    }
}
