//! Application error types
//!
//! Top-level error type for the relay and client binaries. Library crates
//! carry their own `thiserror` enums and convert at this boundary.

use std::fmt;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Transport errors (WebSocket / TCP)
    #[error("Transport error: {0}")]
    Transport(String),

    // Durable store errors
    #[error("Message store error: {0}")]
    Store(String),

    // Internal errors
    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    /// Create a configuration error
    #[must_use]
    pub fn config(msg: impl fmt::Display) -> Self {
        Self::Config(msg.to_string())
    }

    /// Create a transport error
    #[must_use]
    pub fn transport(msg: impl fmt::Display) -> Self {
        Self::Transport(msg.to_string())
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
