//! Relay error types with WebSocket close code mapping.
//!
//! [`RelayError`] covers everything that can end or degrade a single
//! connection. None of these errors is fatal to the process: each one is
//! scoped to the connection that produced it.

use std::time::Duration;

use axum::extract::ws::close_code;

use crate::domain::ConnectionId;

/// Why a send to one recipient was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailureReason {
    /// The recipient's outbound queue is full (slow reader).
    QueueFull,
    /// The recipient's writer has already shut down.
    Closed,
}

impl std::fmt::Display for SendFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QueueFull => f.write_str("outbound queue full"),
            Self::Closed => f.write_str("connection closed"),
        }
    }
}

/// Per-connection error enum with WebSocket close code mapping.
///
/// # Close Codes
///
/// | Variant                 | Code | Meaning          |
/// |-------------------------|------|------------------|
/// | `HandshakeTimeout`      | 1008 | Policy violation |
/// | `UnrecognizedRole`      | 1008 | Policy violation |
/// | `ClosedBeforeHandshake` | 1008 | Policy violation |
/// | `ShuttingDown`          | 1001 | Going away       |
/// | `Transport`             | 1011 | Internal error   |
/// | everything else         | 1000 | Normal closure   |
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// No identifying message arrived within the handshake window.
    #[error("no handshake within {0:?}")]
    HandshakeTimeout(Duration),

    /// The first message matched neither role sentinel.
    #[error("unrecognized role: {0:?}")]
    UnrecognizedRole(String),

    /// The peer went away before sending an identifying message.
    #[error("connection closed before handshake")]
    ClosedBeforeHandshake,

    /// The peer closed the connection during relay.
    #[error("peer disconnected")]
    PeerDisconnect,

    /// A single outbound send to one recipient failed.
    #[error("send to {recipient} failed: {reason}")]
    SendFailure {
        /// Connection the payload was addressed to.
        recipient: ConnectionId,
        /// Why the payload was rejected.
        reason: SendFailureReason,
    },

    /// The server is shutting down.
    #[error("server shutting down")]
    ShuttingDown,

    /// Reading from or writing to the socket failed.
    #[error("transport error: {0}")]
    Transport(String),
}

impl RelayError {
    /// Returns the WebSocket close code sent to the peer for this error.
    #[must_use]
    pub const fn close_code(&self) -> u16 {
        match self {
            Self::HandshakeTimeout(_) | Self::UnrecognizedRole(_) | Self::ClosedBeforeHandshake => {
                close_code::POLICY
            }
            Self::ShuttingDown => close_code::AWAY,
            Self::Transport(_) => close_code::ERROR,
            Self::PeerDisconnect | Self::SendFailure { .. } => close_code::NORMAL,
        }
    }

    /// Returns `true` for failures caused by the client during the
    /// handshake. These are logged as warnings, never as server errors.
    #[must_use]
    pub const fn is_handshake_rejection(&self) -> bool {
        matches!(
            self,
            Self::HandshakeTimeout(_) | Self::UnrecognizedRole(_) | Self::ClosedBeforeHandshake
        )
    }
}

/// Invalid configuration value read from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `PORT` is set but is not a valid port number.
    #[error("invalid PORT value: {0:?}")]
    InvalidPort(String),

    /// A setting that must be positive was zero.
    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    /// A sentinel is empty or both sentinels are equal.
    #[error("invalid sentinels: {0}")]
    InvalidSentinels(String),
}
