//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::domain::Registry;
use crate::shutdown::ShutdownListener;

/// Shared application state available to all handlers via Axum's
/// `State` extractor, and cloned into every relay session.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live producer/consumer membership.
    pub registry: Arc<Registry>,
    /// Relay settings.
    pub config: Arc<RelayConfig>,
    /// Process shutdown signal.
    pub shutdown: ShutdownListener,
}

impl AppState {
    /// Creates state with an empty registry.
    #[must_use]
    pub fn new(config: RelayConfig, shutdown: ShutdownListener) -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            config: Arc::new(config),
            shutdown,
        }
    }
}
