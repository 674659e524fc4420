use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Service version plus whether the cache backend answers a PING.
/// The cache is optional, so a dead cache does not fail the check.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let cache = if state.cache.is_healthy().await {
        "ok"
    } else {
        "unavailable"
    };
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "careerflow-api",
        "cache": cache
    }))
}
