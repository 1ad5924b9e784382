//! Handles to live connections.
//!
//! A [`PeerHandle`] is what the registry stores for each connection. It does
//! not own the socket: it holds the sending half of the connection's bounded
//! outbound queue, which the connection's writer task drains. Once the
//! session closes, sends through any remaining handle fail with
//! [`SendFailureReason::Closed`].

use std::net::SocketAddr;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::{ConnectionId, Payload};
use crate::error::{RelayError, SendFailureReason};

/// Item queued for a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Data message to deliver.
    Payload(Payload),
    /// Send a close frame, then stop writing.
    Close {
        /// WebSocket close status code.
        code: u16,
        /// Human-readable reason (truncated to fit a close frame).
        reason: String,
    },
}

/// Cloneable, non-owning reference to one live connection.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    id: ConnectionId,
    addr: SocketAddr,
    outbound: mpsc::Sender<Outbound>,
}

impl PeerHandle {
    /// Creates a handle feeding the given outbound queue.
    #[must_use]
    pub const fn new(id: ConnectionId, addr: SocketAddr, outbound: mpsc::Sender<Outbound>) -> Self {
        Self { id, addr, outbound }
    }

    /// Connection identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Remote address, for diagnostics.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Queues a payload without waiting.
    ///
    /// Delivery is best effort: a full queue drops the payload for this
    /// recipient only.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::SendFailure`] if the queue is full or the
    /// connection's writer has stopped.
    pub fn send(&self, payload: Payload) -> Result<(), RelayError> {
        self.outbound
            .try_send(Outbound::Payload(payload))
            .map_err(|err| {
                let reason = match err {
                    TrySendError::Full(_) => SendFailureReason::QueueFull,
                    TrySendError::Closed(_) => SendFailureReason::Closed,
                };
                RelayError::SendFailure {
                    recipient: self.id,
                    reason,
                }
            })
    }

    /// Asks the writer to send a close frame and stop.
    ///
    /// Unlike [`PeerHandle::send`] this waits for queue space, so the close
    /// frame is ordered after every payload already queued.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::SendFailure`] with [`SendFailureReason::Closed`]
    /// if the writer has already stopped.
    pub async fn close(&self, code: u16, reason: impl Into<String>) -> Result<(), RelayError> {
        self.outbound
            .send(Outbound::Close {
                code,
                reason: reason.into(),
            })
            .await
            .map_err(|_| RelayError::SendFailure {
                recipient: self.id,
                reason: SendFailureReason::Closed,
            })
    }

    /// Returns `true` once the writer has dropped its end of the queue.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

/// Builds a handle plus the receiving end of its queue. Test helper.
#[cfg(test)]
pub(crate) fn test_peer(capacity: usize) -> (PeerHandle, mpsc::Receiver<Outbound>) {
    let (tx, rx) = mpsc::channel(capacity);
    let addr = SocketAddr::from(([127, 0, 0, 1], 40_000));
    (PeerHandle::new(ConnectionId::new(), addr, tx), rx)
}
