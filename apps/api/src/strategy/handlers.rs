use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::matching::Namespace;
use crate::state::AppState;
use crate::strategy::tiering::{classify, TieredCandidate};

const MAX_TOP_K: usize = 50;

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Deserialize)]
pub struct StrategyRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub max_roadmaps: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct StrategyResponse {
    pub query: String,
    pub count: usize,
    pub candidates: Vec<TieredCandidate>,
}

/// POST /api/v1/strategy
pub async fn handle_strategy(
    State(state): State<AppState>,
    Json(req): Json<StrategyRequest>,
) -> Result<Json<StrategyResponse>, AppError> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err(AppError::Validation("query must not be empty".to_string()));
    }
    if req.top_k == 0 || req.top_k > MAX_TOP_K {
        return Err(AppError::Validation(format!(
            "top_k must be between 1 and {MAX_TOP_K}"
        )));
    }

    let max_roadmaps = req.max_roadmaps.unwrap_or(state.config.max_roadmaps);
    let matches = state.engine.search(query, Namespace::Jobs, req.top_k).await;
    let candidates = classify(matches, max_roadmaps, query, state.roadmaps.as_ref()).await;
    info!(
        hits = candidates.len(),
        roadmaps = candidates.iter().filter(|c| c.roadmap.is_some()).count(),
        "strategy request served"
    );

    Ok(Json(StrategyResponse {
        query: query.to_string(),
        count: candidates.len(),
        candidates,
    }))
}
