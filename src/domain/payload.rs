//! Opaque relay payloads.

use axum::body::Bytes;
use axum::extract::ws::{Message, Utf8Bytes};

/// A single data message relayed between roles.
///
/// The relay never inspects or rewrites payloads. Both variants are
/// reference-counted, so fanning one payload out to many recipients does
/// not copy the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// UTF-8 text frame (commands, JSON).
    Text(Utf8Bytes),
    /// Binary frame (camera images).
    Binary(Bytes),
}

impl Payload {
    /// Extracts the payload from a data message.
    ///
    /// Returns `None` for control frames (ping, pong, close).
    #[must_use]
    pub fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::Text(text) => Some(Self::Text(text)),
            Message::Binary(bytes) => Some(Self::Binary(bytes)),
            Message::Ping(_) | Message::Pong(_) | Message::Close(_) => None,
        }
    }

    /// Converts the payload back into a WebSocket message.
    #[must_use]
    pub fn into_message(self) -> Message {
        match self {
            Self::Text(text) => Message::Text(text),
            Self::Binary(bytes) => Message::Binary(bytes),
        }
    }

    /// Size of the payload in bytes, for logs.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Text(text) => text.as_str().len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    /// `"text"` or `"binary"`, for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Binary(_) => "binary",
        }
    }
}
