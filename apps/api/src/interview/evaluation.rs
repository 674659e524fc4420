use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::prompts::{evaluation_prompt, EVALUATOR_SYSTEM};
use crate::interview::session::InterviewSession;
use crate::llm_client::{parse_json_payload, ChatMessage, LanguageModel};

/// Final verdict for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    /// 0-100.
    pub score: u8,
    pub verdict: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
}

impl Feedback {
    pub fn fallback() -> Self {
        Feedback {
            score: 0,
            verdict: "Error".to_string(),
            summary: String::new(),
            strengths: Vec::new(),
            improvements: Vec::new(),
        }
    }
}

/// The model sometimes answers with fractional or out-of-range scores.
#[derive(Deserialize)]
struct RawFeedback {
    score: f64,
    verdict: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    improvements: Vec<String>,
}

impl From<RawFeedback> for Feedback {
    fn from(raw: RawFeedback) -> Self {
        let score = if raw.score.is_finite() {
            raw.score.clamp(0.0, 100.0).round() as u8
        } else {
            0
        };
        Feedback {
            score,
            verdict: raw.verdict,
            summary: raw.summary,
            strengths: raw.strengths,
            improvements: raw.improvements,
        }
    }
}

/// One LLM call over the last `window` messages. Never fails.
pub async fn evaluate(llm: &dyn LanguageModel, session: &InterviewSession, window: usize) -> Feedback {
    let mut messages = session.window(window).to_vec();
    messages.push(ChatMessage::user(evaluation_prompt(&session.context)));

    let raw = match llm.converse(EVALUATOR_SYSTEM, &messages).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(session_id = %session.id, "evaluation call failed: {e}");
            return Feedback::fallback();
        }
    };
    match parse_json_payload::<RawFeedback>(&raw) {
        Ok(parsed) => parsed.into(),
        Err(e) => {
            warn!(session_id = %session.id, "evaluation payload unreadable: {e}");
            Feedback::fallback()
        }
    }
}

/// `"113"` and `"113.0"` are job 113; anything non-numeric is no reference.
pub fn parse_job_ref(job_id: Option<&str>) -> Option<i64> {
    let value: f64 = job_id?.trim().parse().ok()?;
    if !value.is_finite() || value < 0.0 || value > i64::MAX as f64 {
        return None;
    }
    Some(value.trunc() as i64)
}

#[derive(Debug, Clone, Serialize)]
pub struct InterviewRecord {
    pub user_id: Uuid,
    pub job_id: Option<i64>,
    pub chat_history: Vec<ChatMessage>,
    pub feedback_report: Feedback,
    pub created_at: DateTime<Utc>,
}

impl InterviewRecord {
    pub fn from_session(user_id: Uuid, session: &InterviewSession, feedback: &Feedback) -> Self {
        InterviewRecord {
            user_id,
            job_id: parse_job_ref(session.context.job_id.as_deref()),
            chat_history: session.messages.clone(),
            feedback_report: feedback.clone(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Error)]
pub enum InsertError {
    /// The optional job reference points at a row that does not exist.
    #[error("referenced job does not exist")]
    MissingReference,

    #[error(transparent)]
    Other(#[from] AppError),
}

#[async_trait]
pub trait InterviewRepository: Send + Sync {
    async fn insert(&self, record: &InterviewRecord) -> Result<(), InsertError>;
}

pub struct PgInterviewRepository {
    pool: PgPool,
}

impl PgInterviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InterviewRepository for PgInterviewRepository {
    async fn insert(&self, record: &InterviewRecord) -> Result<(), InsertError> {
        let result = sqlx::query(
            r#"
            INSERT INTO interviews (user_id, job_id, chat_history, feedback_report, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.user_id)
        .bind(record.job_id)
        .bind(Json(&record.chat_history))
        .bind(Json(&record.feedback_report))
        .bind(record.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                Err(InsertError::MissingReference)
            }
            Err(e) => Err(InsertError::Other(e.into())),
        }
    }
}

/// Inserts the record; if the job reference is dangling, retries once without it.
/// Returns whether the job reference was kept.
pub async fn insert_with_optional_ref(
    repo: &dyn InterviewRepository,
    mut record: InterviewRecord,
) -> Result<bool, AppError> {
    match repo.insert(&record).await {
        Ok(()) => Ok(record.job_id.is_some()),
        Err(InsertError::MissingReference) if record.job_id.is_some() => {
            warn!(job_id = ?record.job_id, "job not found, saving interview without job reference");
            record.job_id = None;
            repo.insert(&record).await.map_err(|e| match e {
                InsertError::Other(e) => e,
                InsertError::MissingReference => {
                    AppError::Conflict("interview insert still references a missing row".to_string())
                }
            })?;
            Ok(false)
        }
        Err(InsertError::MissingReference) => Err(AppError::Conflict(
            "interview insert references a missing row".to_string(),
        )),
        Err(InsertError::Other(e)) => Err(e),
    }
}

/// Persists a finished session. Failures are logged only.
pub async fn persist(repo: &dyn InterviewRepository, session: &InterviewSession, feedback: &Feedback) {
    let Some(user_id) = session.context.user_id else {
        info!(session_id = %session.id, "anonymous session, not persisted");
        return;
    };
    let record = InterviewRecord::from_session(user_id, session, feedback);
    match insert_with_optional_ref(repo, record).await {
        Ok(with_job) => info!(session_id = %session.id, %user_id, with_job, "interview saved"),
        Err(e) => warn!(session_id = %session.id, %user_id, "interview save failed: {e}"),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Rejects any record whose job id is not in `known_jobs`.
    #[derive(Default)]
    pub struct MemoryInterviews {
        pub known_jobs: Vec<i64>,
        pub attempts: Mutex<usize>,
        pub saved: Mutex<Vec<InterviewRecord>>,
        pub broken: bool,
    }

    #[async_trait]
    impl InterviewRepository for MemoryInterviews {
        async fn insert(&self, record: &InterviewRecord) -> Result<(), InsertError> {
            *self.attempts.lock().unwrap() += 1;
            if self.broken {
                return Err(AppError::Internal(anyhow::anyhow!("disk full")).into());
            }
            if let Some(job_id) = record.job_id {
                if !self.known_jobs.contains(&job_id) {
                    return Err(InsertError::MissingReference);
                }
            }
            self.saved.lock().unwrap().push(record.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MemoryInterviews;
    use super::*;
    use crate::interview::session::{InterviewContext, InterviewMode};
    use crate::llm_client::testing::ScriptedLlm;

    fn record(job_id: Option<i64>) -> InterviewRecord {
        InterviewRecord {
            user_id: Uuid::new_v4(),
            job_id,
            chat_history: vec![ChatMessage::assistant("Hi")],
            feedback_report: Feedback::fallback(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_parse_job_ref() {
        assert_eq!(parse_job_ref(Some("113.0")), Some(113));
        assert_eq!(parse_job_ref(Some(" 42 ")), Some(42));
        assert_eq!(parse_job_ref(Some("abc")), None);
        assert_eq!(parse_job_ref(Some("NaN")), None);
        assert_eq!(parse_job_ref(None), None);
    }

    #[tokio::test]
    async fn test_missing_reference_retries_without_job() {
        let repo = MemoryInterviews::default();
        let kept = insert_with_optional_ref(&repo, record(Some(7))).await.unwrap();
        assert!(!kept);
        assert_eq!(*repo.attempts.lock().unwrap(), 2);
        assert_eq!(repo.saved.lock().unwrap()[0].job_id, None);
    }

    #[tokio::test]
    async fn test_known_reference_is_kept() {
        let repo = MemoryInterviews {
            known_jobs: vec![7],
            ..Default::default()
        };
        assert!(insert_with_optional_ref(&repo, record(Some(7))).await.unwrap());
        assert_eq!(*repo.attempts.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let repo = MemoryInterviews {
            broken: true,
            ..Default::default()
        };
        assert!(insert_with_optional_ref(&repo, record(Some(7))).await.is_err());
        assert_eq!(*repo.attempts.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_evaluation_parses_and_clamps() {
        let llm = ScriptedLlm::new(vec![
            "```json\n{\"score\": 104.6, \"verdict\": \"Hired\", \"summary\": \"Strong\"}\n```",
        ]);
        let session = InterviewSession::new(InterviewMode::Text, InterviewContext::default());
        let feedback = evaluate(&llm, &session, 8).await;
        assert_eq!(feedback.score, 100);
        assert_eq!(feedback.verdict, "Hired");
        assert!(feedback.strengths.is_empty());
    }

    #[tokio::test]
    async fn test_evaluation_failure_falls_back() {
        let session = InterviewSession::new(InterviewMode::Text, InterviewContext::default());
        assert_eq!(evaluate(&ScriptedLlm::failing(), &session, 8).await, Feedback::fallback());
        let garbled = ScriptedLlm::new(vec!["The candidate was great"]);
        assert_eq!(evaluate(&garbled, &session, 8).await.verdict, "Error");
    }
}
