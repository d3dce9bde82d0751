//! Domain entities
//!
//! Records owned by the durable message store, as seen by the client session.
//! The relay itself never persists or reads these.

mod conversation;
mod message;

pub use conversation::{ConversationKey, ConversationSummary};
pub use message::{NewMessage, StoredMessage};
