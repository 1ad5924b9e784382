//! HTTP layer: router composition.
//!
//! `/health` is the only plain HTTP route; every other path is handed to
//! the WebSocket upgrade handler.

pub mod handlers;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// Builds the complete router with health and relay endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(handlers::system::routes())
        .fallback(ws_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
