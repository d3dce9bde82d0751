//! Connection management
//!
//! One `Connection` per accepted WebSocket, and the registry mapping user
//! identities to their current connection.

mod connection;
mod registry;

pub use connection::{Connection, ConnectionId};
pub use registry::ConnectionRegistry;
