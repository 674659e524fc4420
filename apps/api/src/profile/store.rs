use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::cache::{Cache, CacheKind};
use crate::errors::AppError;
use crate::profile::merge::{legacy_skill_list, merge_skills, verify};
use crate::profile::models::{
    IncomingSkill, Profile, ProfileRow, ResumeExtraction, SkillMap, SkillRecord,
    VerificationStatus,
};

const PROFILE_COLUMNS: &str = "user_id, name, email, github_url, target_roles, experience_summary, \
     skills, skills_metadata, resume_url, updated_at";

/// Persistence seam for profiles.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<Option<Profile>, AppError>;
    async fn list(&self) -> Result<Vec<Profile>, AppError>;
    /// Replaces both the skill map and the derived flat list.
    async fn save_skills(&self, user_id: Uuid, skills: &SkillMap) -> Result<(), AppError>;
    async fn upsert_from_resume(
        &self,
        user_id: Uuid,
        extraction: &ResumeExtraction,
        resume_url: Option<&str>,
    ) -> Result<(), AppError>;
    /// Returns false when the profile does not exist.
    async fn update_onboarding(
        &self,
        user_id: Uuid,
        github_url: Option<&str>,
        target_roles: Option<&[String]>,
    ) -> Result<bool, AppError>;
}

pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn get(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Profile::from))
    }

    async fn list(&self) -> Result<Vec<Profile>, AppError> {
        let rows: Vec<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Profile::from).collect())
    }

    async fn save_skills(&self, user_id: Uuid, skills: &SkillMap) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE profiles SET skills = $1, skills_metadata = $2, updated_at = NOW() WHERE user_id = $3",
        )
        .bind(legacy_skill_list(skills))
        .bind(Json(skills))
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Profile {user_id}")));
        }
        Ok(())
    }

    async fn upsert_from_resume(
        &self,
        user_id: Uuid,
        extraction: &ResumeExtraction,
        resume_url: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, name, email, target_roles, experience_summary, resume_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE SET
                name = COALESCE(EXCLUDED.name, profiles.name),
                email = COALESCE(EXCLUDED.email, profiles.email),
                target_roles = CASE WHEN cardinality(EXCLUDED.target_roles) > 0
                                    THEN EXCLUDED.target_roles ELSE profiles.target_roles END,
                experience_summary = COALESCE(EXCLUDED.experience_summary, profiles.experience_summary),
                resume_url = COALESCE(EXCLUDED.resume_url, profiles.resume_url),
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(&extraction.name)
        .bind(&extraction.email)
        .bind(&extraction.target_roles)
        .bind(&extraction.experience_summary)
        .bind(resume_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_onboarding(
        &self,
        user_id: Uuid,
        github_url: Option<&str>,
        target_roles: Option<&[String]>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE profiles SET
                github_url = COALESCE($1, github_url),
                target_roles = COALESCE($2, target_roles),
                updated_at = NOW()
            WHERE user_id = $3
            "#,
        )
        .bind(github_url)
        .bind(target_roles)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Serialize)]
pub struct VerifyOutcome {
    pub correct: bool,
    pub new_status: VerificationStatus,
    pub message: String,
    pub record: Option<SkillRecord>,
}

/// Skill Profile Store: repository plus the profile cache.
#[derive(Clone)]
pub struct ProfileStore {
    repo: Arc<dyn ProfileRepository>,
    cache: Cache,
}

impl ProfileStore {
    pub fn new(repo: Arc<dyn ProfileRepository>, cache: Cache) -> Self {
        Self { repo, cache }
    }

    /// Read-through profile lookup.
    pub async fn get(&self, user_id: Uuid) -> Result<Profile, AppError> {
        let repo = &self.repo;
        self.cache
            .read_through(CacheKind::Profile, user_id, || repo.get(user_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {user_id}")))
    }

    /// Bypasses the cache. Used before read-modify-write.
    async fn load_fresh(&self, user_id: Uuid) -> Result<Profile, AppError> {
        self.repo
            .get(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {user_id}")))
    }

    pub async fn list(&self) -> Result<Vec<Profile>, AppError> {
        self.repo.list().await
    }

    /// Merges detected skills and persists the result.
    pub async fn merge_detected(
        &self,
        user_id: Uuid,
        incoming: &[IncomingSkill],
    ) -> Result<Profile, AppError> {
        let mut profile = self.load_fresh(user_id).await?;
        let existing = std::mem::take(&mut profile.skills_metadata);
        let merged = merge_skills(existing, incoming, Utc::now());
        self.persist_skills(&mut profile, merged).await?;
        info!(%user_id, merged = incoming.len(), total = profile.skills.len(), "skills merged");
        Ok(profile)
    }

    pub async fn verify_skill(
        &self,
        user_id: Uuid,
        skill_name: &str,
        passed: bool,
    ) -> Result<VerifyOutcome, AppError> {
        let skill_name = skill_name.trim();
        if skill_name.is_empty() {
            return Err(AppError::Validation("skill_name must not be empty".to_string()));
        }
        let mut profile = self.load_fresh(user_id).await?;
        let existing = std::mem::take(&mut profile.skills_metadata);
        let (skills, new_status) = verify(existing, skill_name, passed, Utc::now());
        self.persist_skills(&mut profile, skills).await?;

        let message = if passed {
            format!("Congratulations! Your {skill_name} skill has been verified.")
        } else {
            format!(
                "Not quite right. Your {skill_name} status remains: {}",
                new_status.as_str()
            )
        };
        info!(%user_id, skill = skill_name, passed, "quiz verification applied");

        Ok(VerifyOutcome {
            correct: passed,
            new_status,
            message,
            record: profile.skills_metadata.get(skill_name).cloned(),
        })
    }

    pub async fn update_onboarding(
        &self,
        user_id: Uuid,
        github_url: Option<&str>,
        target_roles: Option<&[String]>,
    ) -> Result<(), AppError> {
        if !self
            .repo
            .update_onboarding(user_id, github_url, target_roles)
            .await?
        {
            return Err(AppError::NotFound(format!("Profile {user_id}")));
        }
        self.cache.invalidate(CacheKind::Profile, user_id).await;
        Ok(())
    }

    pub async fn upsert_from_resume(
        &self,
        user_id: Uuid,
        extraction: &ResumeExtraction,
        resume_url: Option<&str>,
    ) -> Result<(), AppError> {
        self.repo
            .upsert_from_resume(user_id, extraction, resume_url)
            .await?;
        self.cache.invalidate(CacheKind::Profile, user_id).await;
        Ok(())
    }

    async fn persist_skills(&self, profile: &mut Profile, skills: SkillMap) -> Result<(), AppError> {
        self.repo.save_skills(profile.user_id, &skills).await?;
        profile.skills = legacy_skill_list(&skills);
        profile.skills_metadata = skills;
        profile.updated_at = Utc::now();
        self.cache.set(CacheKind::Profile, profile.user_id, profile).await;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    pub fn profile(user_id: Uuid, email: Option<&str>) -> Profile {
        Profile {
            user_id,
            name: Some("Ada".to_string()),
            email: email.map(String::from),
            github_url: Some("https://github.com/ada".to_string()),
            target_roles: vec!["Backend Engineer".to_string()],
            experience_summary: Some("Five years of distributed systems".to_string()),
            skills: vec![],
            skills_metadata: SkillMap::new(),
            resume_url: None,
            updated_at: Utc::now(),
        }
    }

    /// In-memory repository preserving insertion order for `list`.
    #[derive(Default)]
    pub struct MemoryProfiles {
        pub rows: Mutex<Vec<Profile>>,
        pub fail_list: bool,
    }

    impl MemoryProfiles {
        pub fn with(profiles: Vec<Profile>) -> Self {
            Self {
                rows: Mutex::new(profiles),
                fail_list: false,
            }
        }

        pub fn snapshot(&self, user_id: Uuid) -> Option<Profile> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.user_id == user_id)
                .cloned()
        }
    }

    #[async_trait]
    impl ProfileRepository for MemoryProfiles {
        async fn get(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
            Ok(self.snapshot(user_id))
        }

        async fn list(&self) -> Result<Vec<Profile>, AppError> {
            if self.fail_list {
                return Err(AppError::Internal(anyhow::anyhow!("connection reset")));
            }
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn save_skills(&self, user_id: Uuid, skills: &SkillMap) -> Result<(), AppError> {
            let mut rows = self.rows.lock().unwrap();
            let profile = rows
                .iter_mut()
                .find(|p| p.user_id == user_id)
                .ok_or_else(|| AppError::NotFound(format!("Profile {user_id}")))?;
            profile.skills = legacy_skill_list(skills);
            profile.skills_metadata = skills.clone();
            Ok(())
        }

        async fn upsert_from_resume(
            &self,
            user_id: Uuid,
            extraction: &ResumeExtraction,
            resume_url: Option<&str>,
        ) -> Result<(), AppError> {
            let mut rows = self.rows.lock().unwrap();
            let index = match rows.iter().position(|p| p.user_id == user_id) {
                Some(index) => index,
                None => {
                    rows.push(profile(user_id, None));
                    rows.len() - 1
                }
            };
            let row = &mut rows[index];
            row.name = extraction.name.clone().or(row.name.take());
            row.email = extraction.email.clone().or(row.email.take());
            if !extraction.target_roles.is_empty() {
                row.target_roles = extraction.target_roles.clone();
            }
            row.experience_summary = extraction
                .experience_summary
                .clone()
                .or(row.experience_summary.take());
            row.resume_url = resume_url.map(String::from).or(row.resume_url.take());
            Ok(())
        }

        async fn update_onboarding(
            &self,
            user_id: Uuid,
            github_url: Option<&str>,
            target_roles: Option<&[String]>,
        ) -> Result<bool, AppError> {
            let mut rows = self.rows.lock().unwrap();
            let Some(row) = rows.iter_mut().find(|p| p.user_id == user_id) else {
                return Ok(false);
            };
            if let Some(url) = github_url {
                row.github_url = Some(url.to_string());
            }
            if let Some(roles) = target_roles {
                row.target_roles = roles.to_vec();
            }
            Ok(true)
        }
    }
}
