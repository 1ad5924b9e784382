//! relay-hub server entry point.
//!
//! Loads configuration, binds `0.0.0.0:PORT` and relays between producers
//! and consumers until Ctrl-C or SIGTERM.

use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use relay_hub::app_state::AppState;
use relay_hub::config::{LogFormat, RelayConfig};
use relay_hub::server;
use relay_hub::shutdown::ShutdownController;

/// How long live sessions get to unregister and close after shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first so a `.env` file can set RUST_LOG
    let config = RelayConfig::from_env().context("invalid configuration")?;
    init_tracing(config.log_format);

    let addr = config.listen_addr;
    tracing::info!(%addr, "starting relay-hub");

    let controller = ShutdownController::new();
    let state = AppState::new(config, controller.listener());
    let mut serve_shutdown = controller.listener();

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "server listening");

    let mut server = tokio::spawn(server::serve(listener, state, async move {
        serve_shutdown.recv().await;
    }));

    tokio::select! {
        joined = &mut server => {
            joined.context("server task failed")?.context("server error")?;
        }
        () = server::shutdown_signal() => {
            tracing::info!("shutdown requested");
            controller.trigger();
            server
                .await
                .context("server task failed")?
                .context("server error")?;
            if controller.drain(DRAIN_TIMEOUT).await {
                tracing::info!("all sessions closed");
            } else {
                tracing::warn!(timeout = ?DRAIN_TIMEOUT, "sessions still open after drain timeout");
            }
        }
    }

    tracing::info!("relay-hub stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}
