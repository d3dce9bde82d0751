//! # homelink-client
//!
//! Client session for the marketplace chat: drives the relay protocol over a
//! live WebSocket and the durable message store over REST, reconciling the
//! two into a single conversation view.

pub mod conversation;
pub mod session;
pub mod store;
pub mod transport;

pub use conversation::{ChatMessage, ConversationView, DeliveryState};
pub use session::{ChatSession, SessionConfig, SessionError, SessionState};
pub use store::{HttpMessageStore, MessageStore, StoreError};
pub use transport::{connect_relay, RelayLink, TransportError};
