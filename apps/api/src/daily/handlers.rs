use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::daily::job::DailyRunReport;
use crate::daily::notify::NotificationReport;
use crate::daily::snapshot::DailySnapshot;
use crate::errors::AppError;
use crate::state::AppState;
use crate::strategy::roadmap::RoadmapPlan;
use crate::strategy::{ApplicationText, TieredCandidate};

pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Serialize)]
pub struct TodayResponse {
    pub status: &'static str,
    pub data: DailySnapshot,
    pub updated_at: DateTime<Utc>,
    /// True when the snapshot was generated by this request.
    pub fresh: bool,
}

/// GET /api/v1/today
pub async fn handle_get_today(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<TodayResponse>, AppError> {
    let (data, fresh) = match state.daily.snapshot(params.user_id).await? {
        Some(snapshot) => (snapshot, false),
        None => (state.daily.process_user_id(params.user_id).await?, true),
    };
    Ok(Json(TodayResponse {
        status: "success",
        updated_at: data.generated_at,
        data,
        fresh,
    }))
}

#[derive(Serialize)]
pub struct JobSummary {
    pub id: String,
    pub title: String,
    pub organization: String,
    pub similarity: f64,
}

impl From<&TieredCandidate> for JobSummary {
    fn from(job: &TieredCandidate) -> Self {
        JobSummary {
            id: job.candidate.id.clone(),
            title: job.candidate.title.clone(),
            organization: job.candidate.organization.clone(),
            similarity: job.candidate.similarity,
        }
    }
}

#[derive(Serialize)]
pub struct JobRoadmapResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub job: JobSummary,
    pub roadmap: Option<RoadmapPlan>,
}

/// GET /api/v1/today/jobs/:job_id/roadmap
pub async fn handle_get_job_roadmap(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<JobRoadmapResponse>, AppError> {
    let snapshot = state
        .daily
        .snapshot(params.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No daily data yet. Refresh first.".to_string()))?;
    let job = snapshot
        .find_job(&job_id)
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id}")))?;

    let message = job.roadmap.is_none().then(|| {
        format!(
            "No roadmap for this job ({}: {})",
            job.status, job.action
        )
    });
    Ok(Json(JobRoadmapResponse {
        status: "success",
        message,
        job: JobSummary::from(job),
        roadmap: job.roadmap.clone(),
    }))
}

#[derive(Serialize)]
pub struct JobApplicationResponse {
    pub status: &'static str,
    pub job: JobSummary,
    pub application_text: ApplicationText,
}

/// GET /api/v1/today/jobs/:job_id/application
pub async fn handle_get_job_application(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<JobApplicationResponse>, AppError> {
    let (job, application_text) = state.daily.application_text(params.user_id, &job_id).await?;
    Ok(Json(JobApplicationResponse {
        status: "success",
        job: JobSummary::from(&job),
        application_text,
    }))
}

/// Compares every byte regardless of where the first mismatch is. Only the length
/// can short-circuit.
fn secrets_match(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        return false;
    }
    provided
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

fn check_cron_secret(expected: Option<&str>, headers: &HeaderMap) -> Result<(), AppError> {
    let expected =
        expected.ok_or_else(|| AppError::Unavailable("CRON_SECRET is not configured".to_string()))?;
    let provided = headers
        .get(CRON_SECRET_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();
    if !secrets_match(provided, expected.as_bytes()) {
        return Err(AppError::Unauthorized("Invalid cron secret".to_string()));
    }
    Ok(())
}

/// POST /api/v1/cron/daily
pub async fn handle_cron_daily(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DailyRunReport>, AppError> {
    check_cron_secret(state.config.cron_secret.as_deref(), &headers)?;
    Ok(Json(state.daily.run_for_all_users().await))
}

/// POST /api/v1/cron/notifications
pub async fn handle_cron_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<NotificationReport>, AppError> {
    check_cron_secret(state.config.cron_secret.as_deref(), &headers)?;
    Ok(Json(state.notifier.run().await))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_cron_secret_must_match() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            check_cron_secret(Some("s3cret"), &headers),
            Err(AppError::Unauthorized(_))
        ));
        headers.insert(CRON_SECRET_HEADER, HeaderValue::from_static("wrong"));
        assert!(check_cron_secret(Some("s3cret"), &headers).is_err());
        headers.insert(CRON_SECRET_HEADER, HeaderValue::from_static("s3cret"));
        assert!(check_cron_secret(Some("s3cret"), &headers).is_ok());
    }

    #[test]
    fn test_secret_comparison_checks_length_and_bytes() {
        assert!(secrets_match(b"s3cret", b"s3cret"));
        assert!(!secrets_match(b"s3cre", b"s3cret"));
        assert!(!secrets_match(b"s3creT", b"s3cret"));
        assert!(!secrets_match(b"", b"s3cret"));
        let mut headers = HeaderMap::new();
        headers.insert(CRON_SECRET_HEADER, HeaderValue::from_static("s3cret-and-more"));
        assert!(check_cron_secret(Some("s3cret"), &headers).is_err());
    }

    #[test]
    fn test_unconfigured_secret_refuses() {
        let mut headers = HeaderMap::new();
        headers.insert(CRON_SECRET_HEADER, HeaderValue::from_static("anything"));
        assert!(matches!(
            check_cron_secret(None, &headers),
            Err(AppError::Unavailable(_))
        ));
    }
}
