//! Relay wire events
//!
//! Tagged unions for both directions of the live connection. A `RelayEvent`
//! is transient by definition: it is never persisted, and the durable store
//! learns about messages through an entirely separate REST write performed by
//! the sending client.

mod client_events;
mod payloads;
mod server_events;

pub use client_events::ClientEvent;
pub use payloads::MessagePayload;
pub use server_events::ServerEvent;

use thiserror::Error;

/// Error decoding a wire frame into an event
#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("malformed event frame: {0}")]
    Malformed(#[from] serde_json::Error),
}
