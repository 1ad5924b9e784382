//! Relay session state machine.
//!
//! One session runs per accepted connection:
//!
//! ```text
//! Connecting ──► Identifying ──► Relaying ──► Closed
//!                     │                         ▲
//!                     └── timeout / bad role ───┘  (close 1008, never registered)
//! ```
//!
//! While relaying, every payload read from the connection is fanned out to
//! all members of the opposite role. Leaving the loop for any reason runs the
//! same cleanup exactly once: unregister, then close.

use std::fmt::Display;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::messages::{Notice, truncate_close_reason};
use super::writer::run_writer;
use crate::app_state::AppState;
use crate::config::RelayConfig;
use crate::domain::{ConnectionId, Payload, PeerHandle, Role, broadcast};
use crate::error::RelayError;
use crate::shutdown::ShutdownListener;

/// How long cleanup waits for the writer to flush and close.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Why the relay loop ended.
#[derive(Debug)]
enum SessionExit {
    /// The read side ended (`PeerDisconnect`, `Transport` or `ShuttingDown`);
    /// the socket still needs a close frame.
    Read(RelayError),
    /// The writer already stopped, so there is nothing left to close.
    WriterStopped(Result<(), RelayError>),
}

impl SessionExit {
    fn close_frame(&self) -> Option<(u16, String)> {
        match self {
            Self::Read(err) => Some((err.close_code(), err.to_string())),
            Self::WriterStopped(_) => None,
        }
    }
}

/// Runs the session for one accepted connection until it is closed.
///
/// Generic over the socket so the same state machine serves Axum's
/// `WebSocket` and in-memory sockets in tests.
pub async fn run_session<S, E>(socket: S, peer: SocketAddr, state: AppState)
where
    S: Stream<Item = Result<Message, E>> + Sink<Message, Error = E> + Send + Unpin + 'static,
    E: Display + Send + 'static,
{
    let connection_id = ConnectionId::new();
    tracing::info!(%connection_id, %peer, "connection accepted");

    let (mut sink, mut stream) = socket.split();
    let mut shutdown = state.shutdown.clone();

    let identified = tokio::select! {
        outcome = identify(&mut stream, &state.config) => outcome,
        () = shutdown.recv() => Err(RelayError::ShuttingDown),
    };

    let role = match identified {
        Ok(role) => role,
        Err(err) => {
            if err.is_handshake_rejection() {
                tracing::warn!(%connection_id, %peer, reason = %err, "handshake rejected");
            } else {
                tracing::info!(%connection_id, %peer, reason = %err, "closed during handshake");
            }
            close_unregistered(&mut sink, &err, connection_id).await;
            return;
        }
    };

    let (outbound_tx, outbound_rx) = mpsc::channel(state.config.outbound_queue_capacity);
    let handle = PeerHandle::new(connection_id, peer, outbound_tx);
    let mut writer = tokio::spawn(run_writer(sink, outbound_rx, connection_id));

    state.registry.register(role, handle.clone()).await;
    tracing::info!(%connection_id, %peer, %role, "connection identified");

    let exit = relay(&mut stream, &handle, role, &state, &mut writer, &mut shutdown).await;

    let removed = state.registry.unregister(role, connection_id).await;
    match &exit {
        SessionExit::Read(err @ RelayError::Transport(_)) => {
            tracing::warn!(%connection_id, %role, error = %err, "read failed");
        }
        SessionExit::WriterStopped(Err(err)) => {
            tracing::warn!(%connection_id, %role, error = %err, "write failed");
        }
        _ => {}
    }
    if let Some((code, reason)) = exit.close_frame() {
        close_registered(handle, writer, code, &reason).await;
    }

    tracing::info!(%connection_id, %peer, %role, removed, exit = ?exit, "connection closed");
}

/// Waits for the first data message and classifies it.
async fn identify<St, E>(stream: &mut St, config: &RelayConfig) -> Result<Role, RelayError>
where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let first = tokio::time::timeout(config.handshake_timeout, next_data_message(stream))
        .await
        .map_err(|_| RelayError::HandshakeTimeout(config.handshake_timeout))??;

    match first {
        Payload::Text(text) => Role::identify(text.as_str(), &config.sentinels),
        Payload::Binary(bytes) => Err(RelayError::UnrecognizedRole(format!(
            "<binary frame, {} bytes>",
            bytes.len()
        ))),
    }
}

/// Skips control frames and returns the next data message.
async fn next_data_message<St, E>(stream: &mut St) -> Result<Payload, RelayError>
where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    while let Some(next) = stream.next().await {
        match next {
            Ok(Message::Close(_)) => return Err(RelayError::ClosedBeforeHandshake),
            Ok(message) => {
                if let Some(payload) = Payload::from_message(message) {
                    return Ok(payload);
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, "read failed before handshake");
                return Err(RelayError::ClosedBeforeHandshake);
            }
        }
    }
    Err(RelayError::ClosedBeforeHandshake)
}

/// Reads and forwards payloads until the connection ends.
async fn relay<St, E>(
    stream: &mut St,
    handle: &PeerHandle,
    role: Role,
    state: &AppState,
    writer: &mut JoinHandle<Result<(), RelayError>>,
    shutdown: &mut ShutdownListener,
) -> SessionExit
where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        tokio::select! {
            next = stream.next() => match next {
                Some(Ok(Message::Close(_))) | None => {
                    return SessionExit::Read(RelayError::PeerDisconnect);
                }
                Some(Ok(message)) => {
                    if let Some(payload) = Payload::from_message(message) {
                        forward(handle, role, payload, state).await;
                    }
                }
                Some(Err(err)) => return SessionExit::Read(RelayError::Transport(err.to_string())),
            },
            joined = &mut *writer => {
                let result = joined.unwrap_or_else(|err| Err(RelayError::Transport(err.to_string())));
                return SessionExit::WriterStopped(result);
            }
            () = shutdown.recv() => return SessionExit::Read(RelayError::ShuttingDown),
        }
    }
}

/// Fans one payload out to the opposite role.
///
/// Consumer commands are logged at info, producer frames at debug.
async fn forward(handle: &PeerHandle, role: Role, payload: Payload, state: &AppState) {
    let connection_id = handle.id();
    let peer = handle.addr();
    let recipients = state.registry.snapshot(role.opposite()).await;
    let report = broadcast(&recipients, &payload);

    for (recipient, err) in &report.failures {
        tracing::warn!(%connection_id, %role, %recipient, error = %err, "relay to peer failed");
    }
    match role {
        Role::Consumer => tracing::info!(
            %connection_id,
            %peer,
            kind = payload.kind(),
            bytes = payload.byte_len(),
            attempted = report.attempted(),
            delivered = report.delivered,
            skipped = report.skipped,
            "command relayed"
        ),
        Role::Producer => tracing::debug!(
            %connection_id,
            %peer,
            kind = payload.kind(),
            bytes = payload.byte_len(),
            attempted = report.attempted(),
            delivered = report.delivered,
            skipped = report.skipped,
            "frame relayed"
        ),
    }

    if role == Role::Consumer && state.registry.is_empty(Role::Producer).await {
        tracing::info!(%connection_id, %peer, "no producer connected");
        if let Err(err) = handle.send(Notice::no_producer().to_payload()) {
            tracing::warn!(%connection_id, error = %err, "no-producer notice not sent");
        }
    }
}

/// Closes a connection that never got past the handshake.
async fn close_unregistered<W, E>(sink: &mut W, err: &RelayError, connection_id: ConnectionId)
where
    W: Sink<Message, Error = E> + Unpin,
    E: Display,
{
    let frame = CloseFrame {
        code: err.close_code(),
        reason: Utf8Bytes::from(truncate_close_reason(&err.to_string()).to_owned()),
    };
    if let Err(send_err) = sink.send(Message::Close(Some(frame))).await {
        tracing::debug!(%connection_id, error = %send_err, "close frame not sent");
    }
    if let Err(close_err) = sink.close().await {
        tracing::debug!(%connection_id, error = %close_err, "socket close failed");
    }
}

/// Asks the writer to close the socket and waits for it to finish.
///
/// Failures are logged and otherwise ignored.
async fn close_registered(
    handle: PeerHandle,
    mut writer: JoinHandle<Result<(), RelayError>>,
    code: u16,
    reason: &str,
) {
    let connection_id = handle.id();
    match tokio::time::timeout(CLOSE_TIMEOUT, handle.close(code, reason)).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::debug!(%connection_id, error = %err, "close request not queued"),
        Err(_) => tracing::debug!(%connection_id, "close request timed out"),
    }
    drop(handle);

    match tokio::time::timeout(CLOSE_TIMEOUT, &mut writer).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(err))) => tracing::debug!(%connection_id, error = %err, "writer ended with error"),
        Ok(Err(err)) => tracing::warn!(%connection_id, error = %err, "writer task failed"),
        Err(_) => {
            tracing::warn!(%connection_id, "writer did not finish in time");
            writer.abort();
        }
    }
}
