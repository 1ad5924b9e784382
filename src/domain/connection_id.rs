//! Type-safe connection identifier.

use std::fmt;

use serde::Serialize;

/// Unique identifier for one accepted WebSocket connection.
///
/// Wraps a UUID v4 generated on accept. Used as the membership key in
/// [`super::Registry`] and as the `connection_id` field of every log event
/// the session emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Creates a new random `ConnectionId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
