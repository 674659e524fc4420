use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::saved_jobs::service::{CompletionOutcome, ProgressReport, SavedCheck};
use crate::saved_jobs::store::SavedJob;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct SaveJobRequest {
    pub user_id: Uuid,
    pub job_id: String,
}

fn require_job_id(job_id: &str) -> Result<&str, AppError> {
    let job_id = job_id.trim();
    if job_id.is_empty() {
        return Err(AppError::Validation("job_id must not be empty".to_string()));
    }
    Ok(job_id)
}

/// POST /api/v1/saved-jobs
pub async fn handle_save_job(
    State(state): State<AppState>,
    Json(req): Json<SaveJobRequest>,
) -> Result<(StatusCode, Json<SavedJob>), AppError> {
    let job_id = require_job_id(&req.job_id)?;
    let saved = state.saved_jobs.save(req.user_id, job_id).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// GET /api/v1/saved-jobs
pub async fn handle_list_saved_jobs(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<SavedJob>>, AppError> {
    Ok(Json(state.saved_jobs.list(params.user_id).await?))
}

#[derive(Deserialize)]
pub struct CheckQuery {
    pub user_id: Uuid,
    pub job_id: String,
}

/// GET /api/v1/saved-jobs/check
pub async fn handle_check_saved_job(
    State(state): State<AppState>,
    Query(params): Query<CheckQuery>,
) -> Result<Json<SavedCheck>, AppError> {
    let job_id = require_job_id(&params.job_id)?;
    Ok(Json(state.saved_jobs.check(params.user_id, job_id).await?))
}

/// DELETE /api/v1/saved-jobs/:id
pub async fn handle_remove_saved_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    state.saved_jobs.remove(params.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/saved-jobs/:id/progress
pub async fn handle_get_saved_job_progress(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ProgressReport>, AppError> {
    Ok(Json(state.saved_jobs.progress(params.user_id, id).await?))
}

#[derive(Deserialize)]
pub struct ProgressUpdate {
    pub user_id: Uuid,
    pub node_id: String,
    pub completed: bool,
}

/// PUT /api/v1/saved-jobs/:id/progress
pub async fn handle_put_saved_job_progress(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ProgressUpdate>,
) -> Result<Json<ProgressReport>, AppError> {
    let report = state
        .saved_jobs
        .update_progress(req.user_id, id, req.node_id.trim(), req.completed)
        .await?;
    Ok(Json(report))
}

#[derive(Deserialize)]
pub struct CompleteRequest {
    pub user_id: Uuid,
}

/// POST /api/v1/saved-jobs/:id/complete
pub async fn handle_complete_saved_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<CompleteRequest>,
) -> Result<Json<CompletionOutcome>, AppError> {
    let outcome = state.saved_jobs.complete(req.user_id, id).await?;
    // Snapshot and activity entries were derived from the old profile
    state.cache.flush_user(req.user_id).await;
    Ok(Json(outcome))
}
