use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::practice::store::{PracticeProgress, QuizAnswers};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

/// GET /api/v1/practice/progress
pub async fn handle_get_progress(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<PracticeProgress>, AppError> {
    Ok(Json(state.practice.get(params.user_id).await?))
}

#[derive(Deserialize)]
pub struct ProgressRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub solved_problem_ids: Vec<i64>,
    /// Omitted answers keep what is stored.
    pub quiz_answers: Option<QuizAnswers>,
}

/// PUT /api/v1/practice/progress
pub async fn handle_put_progress(
    State(state): State<AppState>,
    Json(req): Json<ProgressRequest>,
) -> Result<Json<PracticeProgress>, AppError> {
    if req.solved_problem_ids.iter().any(|id| *id <= 0) {
        return Err(AppError::Validation(
            "solved_problem_ids must be positive".to_string(),
        ));
    }
    let saved = state
        .practice
        .save(req.user_id, &req.solved_problem_ids, req.quiz_answers.as_ref())
        .await?;
    Ok(Json(saved))
}
