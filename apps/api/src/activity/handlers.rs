use axum::{extract::State, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::activity::models::AnalysisResult;
use crate::activity::source::extract_username;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ActivityCheckRequest {
    pub user_id: Uuid,
}

/// POST /api/v1/activity/check
pub async fn handle_activity_check(
    State(state): State<AppState>,
    Json(req): Json<ActivityCheckRequest>,
) -> Result<Json<AnalysisResult>, AppError> {
    let profile = state.profiles.get(req.user_id).await?;
    let github_url = profile.github_url.as_deref().ok_or_else(|| {
        AppError::Validation("GitHub URL not set. Complete onboarding first.".to_string())
    })?;
    let username = extract_username(github_url)?;
    let result = state
        .detector
        .check_and_maybe_analyze(req.user_id, &username)
        .await?;
    Ok(Json(result))
}
