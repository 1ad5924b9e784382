//! Best-effort fan-out with per-recipient failure isolation.

use super::{ConnectionId, Payload, PeerHandle};
use crate::error::RelayError;

/// Outcome of sending one payload to a set of recipients.
#[derive(Debug, Default)]
pub struct BroadcastReport {
    /// Recipients whose queue accepted the payload.
    pub delivered: usize,
    /// Recipients whose writer had already stopped; not attempted.
    pub skipped: usize,
    /// Recipients that rejected it, with the reason.
    pub failures: Vec<(ConnectionId, RelayError)>,
}

impl BroadcastReport {
    /// Recipients a send was attempted on (skipped ones excluded).
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.delivered + self.failures.len()
    }
}

/// Sends `payload` to every recipient.
///
/// Recipients whose writer has stopped are between close and unregister;
/// they are skipped rather than counted as failures. Every other send is
/// attempted exactly once and never waits. A failure is recorded and the
/// loop moves on, so one slow recipient does not affect the others.
#[must_use]
pub fn broadcast(recipients: &[PeerHandle], payload: &Payload) -> BroadcastReport {
    let mut report = BroadcastReport::default();
    for peer in recipients {
        if peer.is_closed() {
            report.skipped += 1;
            continue;
        }
        match peer.send(payload.clone()) {
            Ok(()) => report.delivered += 1,
            Err(err) => report.failures.push((peer.id(), err)),
        }
    }
    report
}
