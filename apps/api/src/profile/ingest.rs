//! Resume ingestion: PDF → text → structured profile → skills (source = resume).

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::{complete_json, LanguageModel};
use crate::matching::{MatchEngine, Namespace};
use crate::profile::models::{IncomingSkill, Profile, ResumeExtraction, SkillSource};
use crate::profile::prompts::{RESUME_EXTRACT_PROMPT, RESUME_EXTRACT_SYSTEM};
use crate::profile::store::ProfileStore;
use crate::storage::{resume_key, ObjectStore};
use crate::strategy::roadmap::truncate;

const RESUME_PROMPT_LIMIT: usize = 12_000;
const SUMMARY_FALLBACK_CHARS: usize = 500;

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, document: Bytes) -> Result<String, AppError>;
}

pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract_text(&self, document: Bytes) -> Result<String, AppError> {
        if !document.starts_with(b"%PDF") {
            return Err(AppError::Validation("Only PDF resumes are supported".to_string()));
        }
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&document))
            .await
            .map_err(|e| AppError::Internal(e.into()))?
            .map_err(|e| AppError::Validation(format!("Could not read PDF: {e}")))
    }
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub profile: Profile,
    pub resume_url: String,
    pub indexed: bool,
}

#[derive(Clone)]
pub struct ResumeIngestor {
    extractor: Arc<dyn TextExtractor>,
    llm: Arc<dyn LanguageModel>,
    objects: Arc<dyn ObjectStore>,
    profiles: ProfileStore,
    engine: MatchEngine,
}

impl ResumeIngestor {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        llm: Arc<dyn LanguageModel>,
        objects: Arc<dyn ObjectStore>,
        profiles: ProfileStore,
        engine: MatchEngine,
    ) -> Self {
        Self {
            extractor,
            llm,
            objects,
            profiles,
            engine,
        }
    }

    pub async fn ingest(&self, user_id: Uuid, document: Bytes) -> Result<IngestResponse, AppError> {
        if document.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }

        let text = self.extractor.extract_text(document.clone()).await?;
        if text.trim().is_empty() {
            return Err(AppError::Validation(
                "No text could be extracted from the document".to_string(),
            ));
        }

        let prompt =
            RESUME_EXTRACT_PROMPT.replace("{resume_text}", truncate(&text, RESUME_PROMPT_LIMIT));
        let mut extraction: ResumeExtraction =
            complete_json(self.llm.as_ref(), &prompt, RESUME_EXTRACT_SYSTEM)
                .await
                .map_err(|e| AppError::Llm(format!("Failed to parse resume: {e}")))?;
        if extraction
            .experience_summary
            .as_deref()
            .map_or(true, |s| s.trim().is_empty())
        {
            extraction.experience_summary =
                Some(truncate(text.trim(), SUMMARY_FALLBACK_CHARS).to_string());
        }

        let resume_url = self
            .objects
            .upload(&resume_key(user_id), document, "application/pdf")
            .await?;

        self.profiles
            .upsert_from_resume(user_id, &extraction, Some(&resume_url))
            .await?;

        let incoming: Vec<IncomingSkill> = extraction
            .skills
            .iter()
            .map(|name| IncomingSkill {
                name: name.clone(),
                source: SkillSource::Resume,
                level: None,
                evidence: "Listed in resume".to_string(),
            })
            .collect();
        let profile = self.profiles.merge_detected(user_id, &incoming).await?;

        let indexed = self.index_profile(&profile).await;
        info!(%user_id, skills = profile.skills.len(), indexed, "resume ingested");

        Ok(IngestResponse {
            profile,
            resume_url,
            indexed,
        })
    }

    /// Upserts the profile vector into the users namespace. Failure is logged only.
    async fn index_profile(&self, profile: &Profile) -> bool {
        let vector = match self.engine.embed(&profile.query_text()).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(user_id = %profile.user_id, "profile embedding failed: {e}");
                return false;
            }
        };
        let metadata = json!({
            "email": profile.email.clone().unwrap_or_default(),
            "skills": profile.skills,
            "type": "user_profile",
        });
        match self
            .engine
            .upsert(&profile.user_id.to_string(), &vector, metadata, Namespace::Users)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(user_id = %profile.user_id, "profile vector upsert failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::cache::Cache;
    use crate::llm_client::testing::ScriptedLlm;
    use crate::matching::engine::testing::{FakeEmbedder, FakeIndex};
    use crate::profile::models::VerificationStatus;
    use crate::profile::store::testing::MemoryProfiles;

    struct StaticText(&'static str);

    #[async_trait]
    impl TextExtractor for StaticText {
        async fn extract_text(&self, _document: Bytes) -> Result<String, AppError> {
            Ok(self.0.to_string())
        }
    }

    #[derive(Default)]
    struct MemoryObjects {
        keys: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ObjectStore for MemoryObjects {
        async fn upload(&self, key: &str, _body: Bytes, _content_type: &str) -> Result<String, AppError> {
            self.keys.lock().unwrap().push(key.to_string());
            Ok(format!("memory://{key}"))
        }
    }

    fn ingestor(
        text: &'static str,
        llm: ScriptedLlm,
        embedder: FakeEmbedder,
    ) -> (ResumeIngestor, Arc<MemoryProfiles>, Arc<MemoryObjects>, Arc<FakeIndex>) {
        let profiles = Arc::new(MemoryProfiles::default());
        let objects = Arc::new(MemoryObjects::default());
        let index = Arc::new(FakeIndex::default());
        let ingestor = ResumeIngestor::new(
            Arc::new(StaticText(text)),
            Arc::new(llm),
            objects.clone(),
            ProfileStore::new(profiles.clone(), Cache::disabled()),
            MatchEngine::new(Arc::new(embedder), index.clone()),
        );
        (ingestor, profiles, objects, index)
    }

    const EXTRACTION: &str = r#"{"name": "Ada", "email": "ada@example.com",
        "skills": ["Rust", "PostgreSQL"], "experience_summary": "Backend engineer",
        "target_roles": ["Backend Engineer"]}"#;

    #[tokio::test]
    async fn test_ingest_creates_profile_with_resume_skills() {
        let (ingestor, profiles, objects, index) = ingestor(
            "Ada Lovelace, Rust",
            ScriptedLlm::new(vec![EXTRACTION]),
            FakeEmbedder::default(),
        );
        let user = Uuid::new_v4();

        let response = ingestor
            .ingest(user, Bytes::from_static(b"%PDF-1.7"))
            .await
            .unwrap();

        assert!(response.indexed);
        assert_eq!(response.profile.skills, vec!["PostgreSQL", "Rust"]);
        let stored = profiles.snapshot(user).unwrap();
        assert_eq!(stored.email.as_deref(), Some("ada@example.com"));
        let rust = &stored.skills_metadata["Rust"];
        assert_eq!(rust.source, SkillSource::Resume);
        assert_eq!(rust.verification_status, VerificationStatus::Pending);
        assert_eq!(*objects.keys.lock().unwrap(), vec![format!("resumes/{user}.pdf")]);
        assert_eq!(index.upserts.lock().unwrap()[0].1, "users");
    }

    #[tokio::test]
    async fn test_index_failure_is_not_fatal() {
        let (ingestor, _, _, _) = ingestor(
            "resume",
            ScriptedLlm::new(vec![EXTRACTION]),
            FakeEmbedder::failing_on("Skills"),
        );
        let response = ingestor
            .ingest(Uuid::new_v4(), Bytes::from_static(b"%PDF"))
            .await
            .unwrap();
        assert!(!response.indexed);
    }

    #[tokio::test]
    async fn test_blank_document_is_validation_error() {
        let (ingestor, _, _, _) = ingestor("   ", ScriptedLlm::default(), FakeEmbedder::default());
        let err = ingestor
            .ingest(Uuid::new_v4(), Bytes::from_static(b"%PDF"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
