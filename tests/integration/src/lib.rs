//! Integration test support for the homelink workspace
//!
//! Spawns the relay (and a durable-store stub) on ephemeral ports and wraps
//! a WebSocket client with typed send/recv.

pub mod fixtures;
pub mod helpers;
