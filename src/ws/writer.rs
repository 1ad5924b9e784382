//! Per-connection outbound writer task.
//!
//! The writer is the only code that writes to a registered connection's
//! socket. Sessions and broadcasts enqueue [`Outbound`] items through a
//! [`crate::domain::PeerHandle`]; the writer drains them in order.

use std::fmt::Display;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes};
use futures_util::{Sink, SinkExt};
use tokio::sync::mpsc;

use super::messages::truncate_close_reason;
use crate::domain::{ConnectionId, Outbound};
use crate::error::RelayError;

/// Drains the outbound queue into the socket.
///
/// Returns when a close request has been written, when every sender has
/// been dropped, or when a socket write fails.
///
/// # Errors
///
/// Returns [`RelayError::Transport`] if writing a payload fails. Failing to
/// write the close frame or to close the sink is only logged: the peer may
/// already be gone.
pub async fn run_writer<W, E>(
    mut sink: W,
    mut outbound: mpsc::Receiver<Outbound>,
    connection_id: ConnectionId,
) -> Result<(), RelayError>
where
    W: Sink<Message, Error = E> + Unpin,
    E: Display,
{
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Payload(payload) => {
                if let Err(err) = sink.send(payload.into_message()).await {
                    tracing::debug!(%connection_id, error = %err, "socket write failed");
                    return Err(RelayError::Transport(err.to_string()));
                }
            }
            Outbound::Close { code, reason } => {
                let frame = CloseFrame {
                    code,
                    reason: Utf8Bytes::from(truncate_close_reason(&reason).to_owned()),
                };
                if let Err(err) = sink.send(Message::Close(Some(frame))).await {
                    tracing::debug!(%connection_id, error = %err, "close frame not sent");
                }
                break;
            }
        }
    }

    if let Err(err) = sink.close().await {
        tracing::debug!(%connection_id, error = %err, "socket close failed");
    }
    Ok(())
}
