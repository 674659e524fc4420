//! Tailored application material: answers to the usual application questions
//! plus a three-part cover letter, written per job.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::llm_client::{complete_json, LanguageModel};
use crate::matching::ScoredCandidate;
use crate::profile::models::Profile;
use crate::strategy::prompts::{APPLICATION_PROMPT, APPLICATION_SYSTEM};
use crate::strategy::roadmap::truncate;

const PROMPT_SKILLS: usize = 10;
const EXPERIENCE_LIMIT: usize = 500;
const JOB_LIMIT: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationText {
    pub why_this_company: String,
    pub why_this_role: String,
    pub short_intro: String,
    pub cover_letter_opening: String,
    pub cover_letter_body: String,
    pub cover_letter_closing: String,
    #[serde(default)]
    pub key_achievements: Vec<String>,
    #[serde(default)]
    pub questions_for_interviewer: Vec<String>,
}

impl ApplicationText {
    /// Generic answers naming the job, used when generation fails.
    pub fn fallback(title: &str, organization: &str) -> Self {
        ApplicationText {
            why_this_company: format!("I am excited about the opportunity at {organization}."),
            why_this_role: format!("The {title} position aligns well with my career goals."),
            short_intro: "I am a professional with experience relevant to this role.".to_string(),
            cover_letter_opening: format!(
                "I am writing to express my interest in the {title} position."
            ),
            cover_letter_body: "My background and skills make me a strong candidate.".to_string(),
            cover_letter_closing: "I look forward to discussing how I can contribute to your team."
                .to_string(),
            key_achievements: vec!["Relevant achievement".to_string()],
            questions_for_interviewer: vec!["What does success look like in this role?".to_string()],
        }
    }

    fn is_blank(&self) -> bool {
        [
            &self.why_this_company,
            &self.why_this_role,
            &self.short_intro,
            &self.cover_letter_opening,
            &self.cover_letter_body,
            &self.cover_letter_closing,
        ]
        .iter()
        .all(|s| s.trim().is_empty())
    }
}

#[async_trait]
pub trait ApplicationWriter: Send + Sync {
    /// Never fails; generation errors produce `ApplicationText::fallback`.
    async fn write(&self, profile: &Profile, job: &ScoredCandidate) -> ApplicationText;
}

pub struct LlmApplicationWriter {
    llm: Arc<dyn LanguageModel>,
}

impl LlmApplicationWriter {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    fn prompt(profile: &Profile, job: &ScoredCandidate) -> String {
        let skills = profile
            .skills
            .iter()
            .take(PROMPT_SKILLS)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        APPLICATION_PROMPT
            .replace("{name}", profile.name.as_deref().unwrap_or("Candidate"))
            .replace("{skills}", &skills)
            .replace(
                "{experience}",
                truncate(profile.experience_summary.as_deref().unwrap_or(""), EXPERIENCE_LIMIT),
            )
            .replace("{title}", &job.title)
            .replace("{organization}", &job.organization)
            .replace("{job}", truncate(&job.description, JOB_LIMIT))
    }
}

#[async_trait]
impl ApplicationWriter for LlmApplicationWriter {
    async fn write(&self, profile: &Profile, job: &ScoredCandidate) -> ApplicationText {
        let prompt = Self::prompt(profile, job);
        match complete_json::<ApplicationText>(self.llm.as_ref(), &prompt, APPLICATION_SYSTEM).await {
            Ok(text) if !text.is_blank() => {
                info!(job_id = %job.id, "application text generated");
                text
            }
            Ok(_) => {
                warn!(job_id = %job.id, "application text came back blank, using fallback");
                ApplicationText::fallback(&job.title, &job.organization)
            }
            Err(e) => {
                warn!(job_id = %job.id, "application text generation failed, using fallback: {e}");
                ApplicationText::fallback(&job.title, &job.organization)
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
    use crate::strategy::tiering::testing::candidate;

    const REPLY: &str = r#"```json
    {"why_this_company": "Acme builds the tools I use daily.",
     "why_this_role": "The role is Rust-heavy.",
     "short_intro": "Backend engineer with five years of distributed systems.",
     "cover_letter_opening": "Dear Acme,",
     "cover_letter_body": "I built a tokio service handling 10k rps.",
     "cover_letter_closing": "I would love to talk.",
     "key_achievements": ["Cut p99 latency by 40%"]}
    ```"#;

    #[tokio::test]
    async fn test_generated_text_is_used() {
        let llm = Arc::new(ScriptedLlm::new(vec![REPLY]));
        let writer = LlmApplicationWriter::new(llm.clone());

        let text = writer
            .write(&profile(Uuid::new_v4(), None), &candidate("j1", 0.7))
            .await;

        assert_eq!(text.why_this_company, "Acme builds the tools I use daily.");
        assert_eq!(text.key_achievements, vec!["Cut p99 latency by 40%"]);
        assert!(text.questions_for_interviewer.is_empty());
        let (_, messages) = llm.seen.lock().unwrap()[0].clone();
        assert!(messages[0].content.contains("TARGET JOB: Role j1 at Acme"));
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_job_specific_text() {
        let writer = LlmApplicationWriter::new(Arc::new(ScriptedLlm::failing()));

        let text = writer
            .write(&profile(Uuid::new_v4(), None), &candidate("j1", 0.7))
            .await;

        assert_eq!(text, ApplicationText::fallback("Role j1", "Acme"));
        assert!(text.why_this_company.contains("Acme"));
    }

    #[tokio::test]
    async fn test_blank_reply_falls_back() {
        let blank = r#"{"why_this_company": "", "why_this_role": " ", "short_intro": "",
            "cover_letter_opening": "", "cover_letter_body": "", "cover_letter_closing": ""}"#;
        let writer = LlmApplicationWriter::new(Arc::new(ScriptedLlm::new(vec![blank])));

        let text = writer
            .write(&profile(Uuid::new_v4(), None), &candidate("j2", 0.5))
            .await;

        assert_eq!(text, ApplicationText::fallback("Role j2", "Acme"));
    }
}
