use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::activity::source::extract_username;
use crate::errors::AppError;
use crate::profile::ingest::IngestResponse;
use crate::profile::models::Profile;
use crate::profile::quiz::SkillQuiz;
use crate::profile::store::VerifyOutcome;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

/// GET /api/v1/profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(state.profiles.get(params.user_id).await?))
}

/// POST /api/v1/profile/resume (multipart: `user_id`, `file`)
pub async fn handle_resume_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>, AppError> {
    let mut user_id: Option<Uuid> = None;
    let mut document: Option<Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("user_id") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid user_id field: {e}")))?;
                user_id = Some(
                    Uuid::parse_str(raw.trim())
                        .map_err(|_| AppError::Validation("user_id must be a UUID".to_string()))?,
                );
            }
            Some("file") => {
                document = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?,
                );
            }
            _ => {}
        }
    }

    let user_id = user_id.ok_or_else(|| AppError::Validation("Missing user_id field".to_string()))?;
    let document = document.ok_or_else(|| AppError::Validation("Missing file field".to_string()))?;

    let response = state.resumes.ingest(user_id, document).await?;
    // Snapshot and activity entries were derived from the old profile
    state.cache.flush_user(user_id).await;
    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct VerifySkillRequest {
    pub user_id: Uuid,
    pub skill_name: String,
    pub passed: bool,
}

/// POST /api/v1/profile/verify
pub async fn handle_verify_skill(
    State(state): State<AppState>,
    Json(req): Json<VerifySkillRequest>,
) -> Result<Json<VerifyOutcome>, AppError> {
    let outcome = state
        .profiles
        .verify_skill(req.user_id, &req.skill_name, req.passed)
        .await?;
    Ok(Json(outcome))
}

#[derive(Deserialize)]
pub struct QuizRequest {
    pub user_id: Uuid,
    pub skill_name: String,
    #[serde(default)]
    pub level: Option<String>,
}

/// POST /api/v1/profile/verify/quiz
pub async fn handle_generate_quiz(
    State(state): State<AppState>,
    Json(req): Json<QuizRequest>,
) -> Result<Json<SkillQuiz>, AppError> {
    let quiz = state
        .quizzes
        .generate(req.user_id, &req.skill_name, req.level.as_deref())
        .await?;
    Ok(Json(quiz))
}

#[derive(Debug, Deserialize)]
pub struct OnboardingRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub target_roles: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct OnboardingResponse {
    pub status: &'static str,
    pub updated_fields: Vec<&'static str>,
    pub user_id: Uuid,
}

/// Blank fields count as absent. A present GitHub URL must name a user.
fn onboarding_changes(
    req: &OnboardingRequest,
) -> Result<(Option<String>, Option<Vec<String>>), AppError> {
    let github_url = match req.github_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => {
            extract_username(url)?;
            Some(url.to_string())
        }
        _ => None,
    };
    let target_roles = req.target_roles.as_ref().and_then(|roles| {
        let roles: Vec<String> = roles
            .iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        (!roles.is_empty()).then_some(roles)
    });
    Ok((github_url, target_roles))
}

/// PATCH /api/v1/profile/onboarding
pub async fn handle_onboarding(
    State(state): State<AppState>,
    Json(req): Json<OnboardingRequest>,
) -> Result<Json<OnboardingResponse>, AppError> {
    let (github_url, target_roles) = onboarding_changes(&req)?;

    let mut updated_fields = Vec::new();
    if github_url.is_some() {
        updated_fields.push("github_url");
    }
    if target_roles.is_some() {
        updated_fields.push("target_roles");
    }
    if updated_fields.is_empty() {
        return Ok(Json(OnboardingResponse {
            status: "no_changes",
            updated_fields,
            user_id: req.user_id,
        }));
    }

    state
        .profiles
        .update_onboarding(req.user_id, github_url.as_deref(), target_roles.as_deref())
        .await?;

    Ok(Json(OnboardingResponse {
        status: "success",
        updated_fields,
        user_id: req.user_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(github_url: Option<&str>, roles: Option<Vec<&str>>) -> OnboardingRequest {
        OnboardingRequest {
            user_id: Uuid::new_v4(),
            github_url: github_url.map(String::from),
            target_roles: roles.map(|r| r.into_iter().map(String::from).collect()),
        }
    }

    #[test]
    fn test_blank_fields_are_no_changes() {
        let (url, roles) = onboarding_changes(&request(Some("  "), Some(vec![" "]))).unwrap();
        assert!(url.is_none());
        assert!(roles.is_none());
    }

    #[test]
    fn test_invalid_github_url_is_rejected() {
        let err = onboarding_changes(&request(Some("https://gitlab.com/ada"), None)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_roles_are_trimmed() {
        let (url, roles) = onboarding_changes(&request(
            Some("https://github.com/ada"),
            Some(vec![" Backend Engineer ", ""]),
        ))
        .unwrap();
        assert_eq!(url.as_deref(), Some("https://github.com/ada"));
        assert_eq!(roles.unwrap(), vec!["Backend Engineer"]);
    }
}
