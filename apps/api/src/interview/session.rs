use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::interview::evaluation::Feedback;
use crate::interview::stages::Stage;
use crate::llm_client::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterviewMode {
    Text,
    Voice,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapInfo {
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub suggested_questions: Vec<String>,
}

/// Fixed for the lifetime of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterviewContext {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    /// Accepted as text; see `evaluation::parse_job_ref`.
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub job: JobInfo,
    #[serde(default)]
    pub user: CandidateInfo,
    #[serde(default)]
    pub gaps: GapInfo,
}

impl InterviewContext {
    pub fn job_title(&self) -> &str {
        self.job
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("Role")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSession {
    pub id: Uuid,
    pub mode: InterviewMode,
    pub messages: Vec<ChatMessage>,
    pub stage: Stage,
    /// Interviewer messages generated so far. Never exceeds the table's `max_turns`.
    pub turn: u32,
    pub stage_turn: u32,
    pub context: InterviewContext,
    pub ending: bool,
    /// Written once, when the session reaches `Stage::End`.
    pub feedback: Option<Feedback>,
    pub created_at: DateTime<Utc>,
    /// When synthesized audio was last sent; drives the echo cooldown.
    #[serde(default)]
    pub last_audio_sent_at: Option<DateTime<Utc>>,
}

impl InterviewSession {
    pub fn new(mode: InterviewMode, context: InterviewContext) -> Self {
        InterviewSession {
            id: Uuid::new_v4(),
            mode,
            messages: Vec::new(),
            stage: Stage::Intro,
            turn: 0,
            stage_turn: 0,
            context,
            ending: false,
            feedback: None,
            created_at: Utc::now(),
            last_audio_sent_at: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.stage == Stage::End && self.feedback.is_some()
    }

    pub fn add_user_message(&mut self, text: &str) {
        self.messages.push(ChatMessage::user(text));
    }

    pub fn last_interviewer_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == crate::llm_client::Role::Assistant)
            .map(|m| m.content.as_str())
    }

    /// The last `size` messages.
    pub fn window(&self, size: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(size);
        &self.messages[start..]
    }
}
