use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Where a skill was first detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillSource {
    Resume,
    Github,
    Manual,
    Quiz,
    /// Learned by finishing a saved job's roadmap.
    Roadmap,
}

/// Ordered so that `Verified > Pending`; status only ever moves up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Verified,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRecord {
    pub source: SkillSource,
    pub verification_status: VerificationStatus,
    pub level: Option<String>,
    pub evidence: String,
    pub last_seen: DateTime<Utc>,
}

/// Skill name → record. Keys are unique per user and iterate sorted, which is
/// also the order of the derived flat skill list.
pub type SkillMap = BTreeMap<String, SkillRecord>;

/// A skill observation from one of the detection sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingSkill {
    pub name: String,
    pub source: SkillSource,
    pub level: Option<String>,
    pub evidence: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub github_url: Option<String>,
    pub target_roles: Vec<String>,
    pub experience_summary: Option<String>,
    /// Derived view of `skills_metadata` keys, replaced wholesale on every persist.
    pub skills: Vec<String>,
    pub skills_metadata: SkillMap,
    pub resume_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Text used to embed the profile for matching.
    pub fn query_text(&self) -> String {
        let mut parts = Vec::new();
        if !self.skills.is_empty() {
            parts.push(format!("Skills: {}", self.skills.join(", ")));
        }
        if !self.target_roles.is_empty() {
            parts.push(format!("Target Roles: {}", self.target_roles.join(", ")));
        }
        if let Some(summary) = self.experience_summary.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("Experience: {summary}"));
        }
        parts.join("\n")
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("there")
    }
}

#[derive(Debug, FromRow)]
pub struct ProfileRow {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub github_url: Option<String>,
    pub target_roles: Vec<String>,
    pub experience_summary: Option<String>,
    pub skills: Vec<String>,
    pub skills_metadata: Json<SkillMap>,
    pub resume_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            user_id: row.user_id,
            name: row.name,
            email: row.email,
            github_url: row.github_url,
            target_roles: row.target_roles,
            experience_summary: row.experience_summary,
            skills: row.skills,
            skills_metadata: row.skills_metadata.0,
            resume_url: row.resume_url,
            updated_at: row.updated_at,
        }
    }
}

/// Fields extracted from a resume by the LLM.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResumeExtraction {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience_summary: Option<String>,
    #[serde(default)]
    pub target_roles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_orders_verified_above_pending() {
        assert!(VerificationStatus::Verified > VerificationStatus::Pending);
    }

    #[test]
    fn test_query_text_skips_empty_sections() {
        let profile = Profile {
            user_id: Uuid::nil(),
            name: None,
            email: None,
            github_url: None,
            target_roles: vec![],
            experience_summary: Some(String::new()),
            skills: vec!["Go".into(), "Rust".into()],
            skills_metadata: SkillMap::new(),
            resume_url: None,
            updated_at: Utc::now(),
        };
        assert_eq!(profile.query_text(), "Skills: Go, Rust");
    }
}
