//! Process-level shutdown signalling and session draining.
//!
//! [`ShutdownController`] flips a `watch` flag that every session listens
//! on. Each [`ShutdownListener`] also carries a clone of a drain `mpsc`
//! sender; once every listener is dropped the controller's drain receiver
//! yields `None`, which is how [`ShutdownController::drain`] knows all
//! sessions have unregistered and closed.

use std::time::Duration;

use tokio::sync::{mpsc, watch};

/// Owner side of the shutdown signal.
#[derive(Debug)]
pub struct ShutdownController {
    notify: watch::Sender<bool>,
    drain_tx: mpsc::Sender<()>,
    drain_rx: mpsc::Receiver<()>,
}

/// Listener side, held by the server and by every live session.
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    notify: watch::Receiver<bool>,
    _drain: mpsc::Sender<()>,
}

impl ShutdownController {
    /// Creates a controller with shutdown not yet requested.
    #[must_use]
    pub fn new() -> Self {
        let (notify, _) = watch::channel(false);
        let (drain_tx, drain_rx) = mpsc::channel(1);
        Self {
            notify,
            drain_tx,
            drain_rx,
        }
    }

    /// Returns a new listener.
    #[must_use]
    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            notify: self.notify.subscribe(),
            _drain: self.drain_tx.clone(),
        }
    }

    /// Signals every listener to stop.
    pub fn trigger(&self) {
        self.notify.send_replace(true);
    }

    /// Waits until every listener has been dropped, or `timeout` elapses.
    ///
    /// Returns `true` if all listeners were dropped in time.
    pub async fn drain(self, timeout: Duration) -> bool {
        let Self {
            notify,
            drain_tx,
            mut drain_rx,
        } = self;
        notify.send_replace(true);
        drop(drain_tx);
        tokio::time::timeout(timeout, drain_rx.recv()).await.is_ok()
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownListener {
    /// Completes once shutdown has been requested.
    ///
    /// If the controller is dropped without triggering, this never
    /// completes.
    pub async fn recv(&mut self) {
        let controller_gone = self.notify.wait_for(|stop| *stop).await.is_err();
        if controller_gone {
            std::future::pending::<()>().await;
        }
    }
}
