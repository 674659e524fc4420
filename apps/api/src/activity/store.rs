use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::activity::models::{ActivityFingerprint, FingerprintRow};
use crate::errors::AppError;

#[async_trait]
pub trait FingerprintRepository: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<Option<ActivityFingerprint>, AppError>;
    async fn put(&self, fingerprint: &ActivityFingerprint) -> Result<(), AppError>;
}

pub struct PgFingerprintRepository {
    pool: PgPool,
}

impl PgFingerprintRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FingerprintRepository for PgFingerprintRepository {
    async fn get(&self, user_id: Uuid) -> Result<Option<ActivityFingerprint>, AppError> {
        let row: Option<FingerprintRow> = sqlx::query_as(
            r#"
            SELECT user_id, last_analyzed_commit_sha, detected_skills, touched_repos,
                   tech_stack_summary, narrative_message, analyzed_at
            FROM activity_fingerprints
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ActivityFingerprint::from))
    }

    async fn put(&self, fp: &ActivityFingerprint) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO activity_fingerprints
                (user_id, last_analyzed_commit_sha, detected_skills, touched_repos,
                 tech_stack_summary, narrative_message, analyzed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE SET
                last_analyzed_commit_sha = EXCLUDED.last_analyzed_commit_sha,
                detected_skills = EXCLUDED.detected_skills,
                touched_repos = EXCLUDED.touched_repos,
                tech_stack_summary = EXCLUDED.tech_stack_summary,
                narrative_message = EXCLUDED.narrative_message,
                analyzed_at = EXCLUDED.analyzed_at
            "#,
        )
        .bind(fp.user_id)
        .bind(&fp.last_analyzed_commit_sha)
        .bind(Json(&fp.detected_skills))
        .bind(&fp.touched_repos)
        .bind(&fp.tech_stack_summary)
        .bind(&fp.narrative_message)
        .bind(fp.analyzed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
