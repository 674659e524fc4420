use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::profile::models::{IncomingSkill, SkillSource};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedSkill {
    pub skill: String,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub evidence: String,
}

impl DetectedSkill {
    pub fn to_incoming(&self) -> IncomingSkill {
        IncomingSkill {
            name: self.skill.clone(),
            source: SkillSource::Github,
            level: Some(
                self.level
                    .clone()
                    .unwrap_or_else(|| "intermediate".to_string()),
            ),
            evidence: if self.evidence.is_empty() {
                "Detected in recent GitHub activity".to_string()
            } else {
                self.evidence.clone()
            },
        }
    }
}

/// What the LLM returns for a batch of code patches.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodeAnalysis {
    #[serde(default)]
    pub detected_skills: Vec<DetectedSkill>,
    #[serde(default)]
    pub tech_stack_summary: String,
    #[serde(default)]
    pub narrative_message: String,
}

/// Recent push activity gathered from the activity source.
#[derive(Debug, Clone)]
pub struct RecentActivity {
    pub code_context: String,
    pub latest_commit_sha: Option<String>,
    pub touched_repos: Vec<String>,
    pub events_analyzed: usize,
}

/// Last analysed commit for a user plus the outputs of that analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityFingerprint {
    pub user_id: Uuid,
    pub last_analyzed_commit_sha: String,
    pub detected_skills: Vec<DetectedSkill>,
    pub touched_repos: Vec<String>,
    pub tech_stack_summary: String,
    pub narrative_message: String,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct FingerprintRow {
    pub user_id: Uuid,
    pub last_analyzed_commit_sha: String,
    pub detected_skills: Json<Vec<DetectedSkill>>,
    pub touched_repos: Vec<String>,
    pub tech_stack_summary: String,
    pub narrative_message: String,
    pub analyzed_at: DateTime<Utc>,
}

impl From<FingerprintRow> for ActivityFingerprint {
    fn from(row: FingerprintRow) -> Self {
        ActivityFingerprint {
            user_id: row.user_id,
            last_analyzed_commit_sha: row.last_analyzed_commit_sha,
            detected_skills: row.detected_skills.0,
            touched_repos: row.touched_repos,
            tech_stack_summary: row.tech_stack_summary,
            narrative_message: row.narrative_message,
            analyzed_at: row.analyzed_at,
        }
    }
}

/// Output of a change check. Built only from the stored fingerprint, so a
/// fresh analysis and a later cache hit for the same SHA are identical.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub user_id: Uuid,
    pub commit_sha: Option<String>,
    pub detected_skills: Vec<DetectedSkill>,
    pub touched_repos: Vec<String>,
    pub tech_stack_summary: String,
    pub message: String,
    pub analyzed_at: Option<DateTime<Utc>>,
}

impl AnalysisResult {
    pub fn from_fingerprint(fp: &ActivityFingerprint) -> Self {
        AnalysisResult {
            user_id: fp.user_id,
            commit_sha: Some(fp.last_analyzed_commit_sha.clone()),
            detected_skills: fp.detected_skills.clone(),
            touched_repos: fp.touched_repos.clone(),
            tech_stack_summary: fp.tech_stack_summary.clone(),
            message: fp.narrative_message.clone(),
            analyzed_at: Some(fp.analyzed_at),
        }
    }

    /// Empty skill delta with an explanation. The fingerprint is not advanced.
    pub fn unchanged(user_id: Uuid, message: &str) -> Self {
        AnalysisResult {
            user_id,
            commit_sha: None,
            detected_skills: Vec::new(),
            touched_repos: Vec::new(),
            tech_stack_summary: String::new(),
            message: message.to_string(),
            analyzed_at: None,
        }
    }
}
