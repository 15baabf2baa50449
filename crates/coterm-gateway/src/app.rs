use axum::{routing::get, Router};
use coterm_core::config::CotermConfig;
use coterm_terminal::SessionRegistry;
use std::sync::Arc;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: CotermConfig,
    pub registry: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(config: CotermConfig, registry: Arc<SessionRegistry>) -> Self {
        Self { config, registry }
    }
}

/// Assemble the full Axum router: the terminal multiplexer's WS endpoint
/// plus an ambient liveness probe.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/ws", get(crate::ws::connection::ws_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
