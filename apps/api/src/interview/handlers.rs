use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::service::{AudioTurn, TurnView};
use crate::interview::session::{InterviewContext, InterviewMode};
use crate::state::AppState;

pub const STAGE_HEADER: &str = "x-interview-stage";
pub const TURN_HEADER: &str = "x-interview-turn";
pub const FINISHED_HEADER: &str = "x-interview-finished";

#[derive(Deserialize)]
pub struct CreateInterviewRequest {
    pub mode: InterviewMode,
    #[serde(default)]
    pub context: InterviewContext,
}

/// POST /api/v1/interviews
pub async fn handle_create_interview(
    State(state): State<AppState>,
    Json(req): Json<CreateInterviewRequest>,
) -> Result<(StatusCode, Json<TurnView>), AppError> {
    let view = state.interviews.create(req.mode, req.context).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[derive(Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

/// POST /api/v1/interviews/:id/messages
pub async fn handle_interview_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<TurnView>, AppError> {
    Ok(Json(state.interviews.message(id, &req.text).await?))
}

/// POST /api/v1/interviews/:id/audio
///
/// Raw audio in, synthesized audio out. Stage, turn, and completion travel in
/// response headers; a chunk inside the echo cooldown gets 202 and no body.
pub async fn handle_interview_audio(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");

    match state.interviews.audio(id, body, content_type).await? {
        AudioTurn::Discarded => Ok(StatusCode::ACCEPTED.into_response()),
        AudioTurn::Spoken {
            view,
            transcript,
            audio,
        } => {
            debug!(session_id = %id, %transcript, stage = view.stage.as_str(), "audio turn");
            let mut out = HeaderMap::new();
            out.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg"));
            out.insert(STAGE_HEADER, HeaderValue::from_static(view.stage.as_str()));
            out.insert(TURN_HEADER, HeaderValue::from(view.turn));
            out.insert(
                FINISHED_HEADER,
                HeaderValue::from_static(if view.finished { "true" } else { "false" }),
            );
            let status = if audio.is_empty() {
                StatusCode::NO_CONTENT
            } else {
                StatusCode::OK
            };
            Ok((status, out, audio).into_response())
        }
    }
}

/// GET /api/v1/interviews/:id
pub async fn handle_get_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TurnView>, AppError> {
    Ok(Json(state.interviews.get(id).await?))
}

/// DELETE /api/v1/interviews/:id
pub async fn handle_discard_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.interviews.discard(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
