//! Skill-verification quiz questions. The answer travels with the question and
//! is checked client-side; `POST /profile/verify` records the outcome.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::{complete_json, LanguageModel};
use crate::profile::models::Profile;
use crate::profile::prompts::{QUIZ_PROMPT, QUIZ_SYSTEM};
use crate::profile::ProfileStore;

pub const OPTION_COUNT: usize = 4;
const DEFAULT_LEVEL: &str = "intermediate";

#[derive(Debug, Deserialize)]
struct QuizDraft {
    question: String,
    options: Vec<String>,
    correct_index: usize,
    #[serde(default)]
    explanation: String,
}

impl QuizDraft {
    fn is_usable(&self) -> bool {
        !self.question.trim().is_empty()
            && self.options.len() == OPTION_COUNT
            && self.options.iter().all(|o| !o.trim().is_empty())
            && self.correct_index < self.options.len()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkillQuiz {
    pub quiz_id: Uuid,
    pub skill_name: String,
    pub level: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: String,
}

/// Level recorded on the profile wins over the one the client asked for.
fn quiz_level(profile: &Profile, skill_name: &str, requested: Option<&str>) -> String {
    profile
        .skills_metadata
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(skill_name))
        .and_then(|(_, record)| record.level.clone())
        .or_else(|| {
            requested
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
        })
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}

#[derive(Clone)]
pub struct QuizMaker {
    llm: Arc<dyn LanguageModel>,
    profiles: ProfileStore,
}

impl QuizMaker {
    pub fn new(llm: Arc<dyn LanguageModel>, profiles: ProfileStore) -> Self {
        Self { llm, profiles }
    }

    /// There is no canned question to fall back to: a generic question says
    /// nothing about the skill, so failures surface as upstream errors.
    pub async fn generate(
        &self,
        user_id: Uuid,
        skill_name: &str,
        level: Option<&str>,
    ) -> Result<SkillQuiz, AppError> {
        let skill_name = skill_name.trim();
        if skill_name.is_empty() {
            return Err(AppError::Validation("skill_name must not be empty".to_string()));
        }
        let profile = self.profiles.get(user_id).await?;
        let level = quiz_level(&profile, skill_name, level);

        let prompt = QUIZ_PROMPT
            .replace("{skill}", skill_name)
            .replace("{level}", &level);
        let draft: QuizDraft = complete_json(self.llm.as_ref(), &prompt, QUIZ_SYSTEM)
            .await
            .map_err(|e| AppError::Upstream(format!("quiz generation failed: {e}")))?;
        if !draft.is_usable() {
            warn!(%user_id, skill = skill_name, options = draft.options.len(), "unusable quiz draft");
            return Err(AppError::Upstream(
                "quiz generation returned an unusable question".to_string(),
            ));
        }

        info!(%user_id, skill = skill_name, %level, "quiz generated");
        Ok(SkillQuiz {
            quiz_id: Uuid::new_v4(),
            skill_name: skill_name.to_string(),
            level,
            question: draft.question.trim().to_string(),
            options: draft.options,
            correct_index: draft.correct_index,
            explanation: draft.explanation,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::cache::Cache;
    use crate::llm_client::testing::ScriptedLlm;
    use crate::profile::models::{SkillRecord, SkillSource, VerificationStatus};
    use crate::profile::store::testing::{profile, MemoryProfiles};

    const GOOD: &str = r#"{
        "question": "Which type lets several threads share ownership of a value?",
        "options": ["Rc<T>", "Arc<T>", "Box<T>", "Cell<T>"],
        "correct_index": 1,
        "explanation": "Arc uses atomic reference counts."
    }"#;

    fn maker(llm: Arc<ScriptedLlm>, profiles: Vec<Profile>) -> QuizMaker {
        QuizMaker::new(
            llm,
            ProfileStore::new(Arc::new(MemoryProfiles::with(profiles)), Cache::disabled()),
        )
    }

    fn with_rust_skill(user: Uuid) -> Profile {
        let mut p = profile(user, None);
        p.skills_metadata.insert(
            "Rust".to_string(),
            SkillRecord {
                source: SkillSource::Resume,
                verification_status: VerificationStatus::Pending,
                level: Some("advanced".to_string()),
                evidence: "Listed in resume".to_string(),
                last_seen: Utc::now(),
            },
        );
        p
    }

    #[tokio::test]
    async fn test_quiz_uses_recorded_level() {
        let user = Uuid::new_v4();
        let llm = Arc::new(ScriptedLlm::new(vec![GOOD]));
        let quiz = maker(llm.clone(), vec![with_rust_skill(user)])
            .generate(user, " rust ", Some("beginner"))
            .await
            .unwrap();

        assert_eq!(quiz.skill_name, "rust");
        assert_eq!(quiz.level, "advanced");
        assert_eq!(quiz.options.len(), OPTION_COUNT);
        assert_eq!(quiz.options[quiz.correct_index], "Arc<T>");
        let seen = llm.seen.lock().unwrap();
        assert!(seen[0].1[0].content.contains("rust at advanced level"));
    }

    #[test]
    fn test_quiz_level_falls_back_to_request_then_default() {
        let user = Uuid::new_v4();
        let p = profile(user, None);

        assert_eq!(quiz_level(&p, "Go", Some("beginner")), "beginner");
        assert_eq!(quiz_level(&p, "Go", Some("  ")), "intermediate");
        assert_eq!(quiz_level(&p, "Go", None), "intermediate");
    }

    #[tokio::test]
    async fn test_quiz_rejects_blank_skill_before_calling_model() {
        let llm = Arc::new(ScriptedLlm::new(vec![GOOD]));
        let err = maker(llm.clone(), vec![])
            .generate(Uuid::new_v4(), "  ", None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_quiz_for_unknown_profile_is_not_found() {
        let llm = Arc::new(ScriptedLlm::new(vec![GOOD]));
        let err = maker(llm, vec![])
            .generate(Uuid::new_v4(), "Rust", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unusable_quiz_is_an_upstream_error() {
        let user = Uuid::new_v4();
        let three_options = r#"{"question": "Q?", "options": ["a", "b", "c"], "correct_index": 0}"#;
        let out_of_range = r#"{"question": "Q?", "options": ["a", "b", "c", "d"], "correct_index": 4}"#;
        let llm = Arc::new(ScriptedLlm::new(vec![three_options, out_of_range, "not json"]));
        let quizzes = maker(llm, vec![profile(user, None)]);

        for _ in 0..3 {
            let err = quizzes.generate(user, "Rust", None).await.unwrap_err();
            assert!(matches!(err, AppError::Upstream(_)));
        }
    }
}
