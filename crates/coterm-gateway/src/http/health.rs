use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health — liveness probe. Session counts are a read-only projection
/// of the registry's own state, not a wire-visible frame.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let sessions = state.registry.list().await;
    let alive = sessions.iter().filter(|s| s.is_alive).count();

    Json(json!({
        "status": "ok",
        "sessions_total": sessions.len(),
        "sessions_alive": alive,
    }))
}
