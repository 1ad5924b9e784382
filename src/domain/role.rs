//! Connection roles and the handshake that assigns them.
//!
//! A connection's role is decided once, from the first message it sends,
//! and never changes afterwards.

use std::fmt;

use crate::error::RelayError;

/// Longest prefix of a rejected handshake message kept for diagnostics.
const REJECTED_PREVIEW_CHARS: usize = 32;

/// Which side of the relay a connection is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Camera-like device streaming frames (e.g. ESP32-CAM).
    Producer,
    /// Controller client sending commands and receiving frames.
    Consumer,
}

impl Role {
    /// Classifies the first message of a connection.
    ///
    /// The message must equal one of the sentinels exactly; there is no
    /// trimming or case folding.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::UnrecognizedRole`] carrying a short preview of
    /// the message when it matches neither sentinel.
    pub fn identify(first_message: &str, sentinels: &Sentinels) -> Result<Self, RelayError> {
        if first_message == sentinels.producer {
            Ok(Self::Producer)
        } else if first_message == sentinels.consumer {
            Ok(Self::Consumer)
        } else {
            Err(RelayError::UnrecognizedRole(
                first_message.chars().take(REJECTED_PREVIEW_CHARS).collect(),
            ))
        }
    }

    /// Returns the role whose members receive this role's payloads.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Producer => Self::Consumer,
            Self::Consumer => Self::Producer,
        }
    }

    /// Lowercase name used in logs and JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Producer => "producer",
            Self::Consumer => "consumer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handshake strings that identify each role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentinels {
    /// First message sent by producers.
    pub producer: String,
    /// First message sent by consumers.
    pub consumer: String,
}

impl Default for Sentinels {
    fn default() -> Self {
        Self {
            producer: "esp32-cam".to_string(),
            consumer: "android-client".to_string(),
        }
    }
}
