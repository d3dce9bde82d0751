//! WebSocket close codes
//!
//! Relay-specific close codes sent when a connection is terminated for a
//! protocol reason rather than a normal transport close.

/// Relay WebSocket close codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    /// Unknown error occurred
    UnknownError = 4000,
    /// Invalid payload encoding (JSON decode error, or a binary frame)
    DecodeError = 4002,
}

impl CloseCode {
    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Get the description for this close code
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownError => "Unknown error occurred",
            Self::DecodeError => "Invalid payload encoding",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_u16())
    }
}
