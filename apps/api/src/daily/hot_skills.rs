//! Skills worth learning next, attached to every daily snapshot.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::daily::prompts::{HOT_SKILLS_PROMPT, HOT_SKILLS_SYSTEM};
use crate::llm_client::{complete_json, LanguageModel};
use crate::profile::models::Profile;
use crate::strategy::TieredCandidate;

pub const HOT_SKILL_COUNT: usize = 3;
const PROMPT_SKILLS: usize = 10;
const PROMPT_ROLES: usize = 3;
const PROMPT_TITLES: usize = 5;

/// Suggested when generation fails, in this order, minus what the user already has.
const TRENDING: [(&str, &str, &str); 6] = [
    ("AI/ML", "rising", "High demand across all tech roles"),
    ("Cloud Architecture", "rising", "Essential for modern systems"),
    ("System Design", "stable", "Key for senior positions"),
    ("Kubernetes", "rising", "Standard for running services"),
    ("Rust", "rising", "Growing use in infrastructure"),
    ("GraphQL", "stable", "Common in API-heavy teams"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotSkill {
    pub skill: String,
    #[serde(default = "default_trend")]
    pub demand_trend: String,
    #[serde(default)]
    pub reason: String,
}

fn default_trend() -> String {
    "rising".to_string()
}

fn has_skill(profile: &Profile, skill: &str) -> bool {
    profile.skills.iter().any(|s| s.eq_ignore_ascii_case(skill))
}

pub fn fallback_hot_skills(profile: &Profile) -> Vec<HotSkill> {
    TRENDING
        .iter()
        .filter(|(skill, _, _)| !has_skill(profile, skill))
        .take(HOT_SKILL_COUNT)
        .map(|(skill, trend, reason)| HotSkill {
            skill: skill.to_string(),
            demand_trend: trend.to_string(),
            reason: reason.to_string(),
        })
        .collect()
}

#[async_trait]
pub trait HotSkillAdvisor: Send + Sync {
    /// Never fails; generation errors produce `fallback_hot_skills`.
    async fn suggest(&self, profile: &Profile, jobs: &[TieredCandidate]) -> Vec<HotSkill>;
}

pub struct LlmHotSkillAdvisor {
    llm: Arc<dyn LanguageModel>,
}

impl LlmHotSkillAdvisor {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    fn prompt(profile: &Profile, jobs: &[TieredCandidate]) -> String {
        let or_default = |items: Vec<String>, default: &str| {
            if items.is_empty() {
                default.to_string()
            } else {
                items.join(", ")
            }
        };
        let skills = or_default(
            profile.skills.iter().take(PROMPT_SKILLS).cloned().collect(),
            "Not specified",
        );
        let roles = or_default(
            profile.target_roles.iter().take(PROMPT_ROLES).cloned().collect(),
            "Software Developer",
        );
        let titles = or_default(
            jobs.iter()
                .take(PROMPT_TITLES)
                .map(|j| j.candidate.title.clone())
                .collect(),
            "Various tech roles",
        );
        HOT_SKILLS_PROMPT
            .replace("{skills}", &skills)
            .replace("{roles}", &roles)
            .replace("{titles}", &titles)
    }
}

#[async_trait]
impl HotSkillAdvisor for LlmHotSkillAdvisor {
    async fn suggest(&self, profile: &Profile, jobs: &[TieredCandidate]) -> Vec<HotSkill> {
        let prompt = Self::prompt(profile, jobs);
        match complete_json::<Vec<HotSkill>>(self.llm.as_ref(), &prompt, HOT_SKILLS_SYSTEM).await {
            Ok(skills) => {
                let skills: Vec<HotSkill> = skills
                    .into_iter()
                    .filter(|s| !s.skill.trim().is_empty() && !has_skill(profile, &s.skill))
                    .take(HOT_SKILL_COUNT)
                    .collect();
                if skills.is_empty() {
                    warn!(user_id = %profile.user_id, "hot skills reply had no usable entries, using fallback");
                    return fallback_hot_skills(profile);
                }
                skills
            }
            Err(e) => {
                warn!(user_id = %profile.user_id, "hot skills generation failed, using fallback: {e}");
                fallback_hot_skills(profile)
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::llm_client::testing::ScriptedLlm;
    use crate::profile::store::testing::profile;
    use crate::strategy::tiering::testing::tiered;

    fn names(skills: &[HotSkill]) -> Vec<&str> {
        skills.iter().map(|s| s.skill.as_str()).collect()
    }

    #[test]
    fn test_fallback_skips_known_skills() {
        let mut p = profile(Uuid::new_v4(), None);
        p.skills = vec!["ai/ml".to_string(), "Rust".to_string()];

        let skills = fallback_hot_skills(&p);

        assert_eq!(names(&skills), vec!["Cloud Architecture", "System Design", "Kubernetes"]);
    }

    #[tokio::test]
    async fn test_reply_is_filtered_and_capped() {
        let reply = r#"[
            {"skill": "Go", "demand_trend": "rising", "reason": "Cloud tooling"},
            {"skill": "Terraform", "demand_trend": "stable", "reason": "IaC"},
            {"skill": "", "reason": "blank"},
            {"skill": "eBPF", "reason": "Observability"},
            {"skill": "WebAssembly", "reason": "Edge"}
        ]"#;
        let mut p = profile(Uuid::new_v4(), None);
        p.skills = vec!["go".to_string()];
        let advisor = LlmHotSkillAdvisor::new(Arc::new(ScriptedLlm::new(vec![reply])));

        let skills = advisor.suggest(&p, &[]).await;

        assert_eq!(names(&skills), vec!["Terraform", "eBPF", "WebAssembly"]);
        assert_eq!(skills[1].demand_trend, "rising");
    }

    #[tokio::test]
    async fn test_failure_uses_fallback() {
        let p = profile(Uuid::new_v4(), None);
        let advisor = LlmHotSkillAdvisor::new(Arc::new(ScriptedLlm::failing()));

        let skills = advisor.suggest(&p, &[]).await;

        assert_eq!(skills, fallback_hot_skills(&p));
        assert_eq!(skills.len(), HOT_SKILL_COUNT);
    }

    #[tokio::test]
    async fn test_prompt_lists_matched_titles() {
        let llm = Arc::new(ScriptedLlm::failing());
        let advisor = LlmHotSkillAdvisor::new(llm.clone());
        let jobs = vec![tiered("j1", 0.9)];

        advisor.suggest(&profile(Uuid::new_v4(), None), &jobs).await;

        let (_, messages) = llm.seen.lock().unwrap()[0].clone();
        assert!(messages[0].content.contains("Role j1"));
        assert!(messages[0].content.contains("Backend Engineer"));
    }
}
