use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::strategy::roadmap::RoadmapPlan;
use crate::strategy::{ApplicationText, TieredCandidate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeProgress {
    pub completed: bool,
    pub updated_at: DateTime<Utc>,
}

/// Roadmap node id ("day-1", "day-2", ...) -> progress.
pub type RoadmapProgress = BTreeMap<String, NodeProgress>;

/// A daily match the user bookmarked, copied out of the snapshot so it outlives
/// the next daily run.
#[derive(Debug, Clone, Serialize)]
pub struct SavedJob {
    pub id: i64,
    pub user_id: Uuid,
    pub job_id: String,
    pub title: String,
    pub organization: String,
    pub description: String,
    pub link: String,
    pub similarity: f64,
    pub roadmap: Option<RoadmapPlan>,
    pub application: Option<ApplicationText>,
    pub progress: RoadmapProgress,
    pub created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct SavedJobRow {
    id: i64,
    user_id: Uuid,
    job_id: String,
    title: String,
    organization: String,
    description: String,
    link: String,
    similarity: f64,
    roadmap: Option<Json<RoadmapPlan>>,
    application: Option<Json<ApplicationText>>,
    progress: Json<RoadmapProgress>,
    created_at: DateTime<Utc>,
}

impl From<SavedJobRow> for SavedJob {
    fn from(row: SavedJobRow) -> Self {
        SavedJob {
            id: row.id,
            user_id: row.user_id,
            job_id: row.job_id,
            title: row.title,
            organization: row.organization,
            description: row.description,
            link: row.link,
            similarity: row.similarity,
            roadmap: row.roadmap.map(|r| r.0),
            application: row.application.map(|a| a.0),
            progress: row.progress.0,
            created_at: row.created_at,
        }
    }
}

const COLUMNS: &str = "id, user_id, job_id, title, organization, description, link, similarity, \
                       roadmap, application, progress, created_at";

#[async_trait]
pub trait SavedJobRepository: Send + Sync {
    /// `None` when the user already saved this job.
    async fn insert(
        &self,
        user_id: Uuid,
        job: &TieredCandidate,
    ) -> Result<Option<SavedJob>, AppError>;
    /// Newest first.
    async fn list(&self, user_id: Uuid) -> Result<Vec<SavedJob>, AppError>;
    async fn get(&self, user_id: Uuid, id: i64) -> Result<Option<SavedJob>, AppError>;
    async fn find_by_job(&self, user_id: Uuid, job_id: &str) -> Result<Option<SavedJob>, AppError>;
    async fn delete(&self, user_id: Uuid, id: i64) -> Result<bool, AppError>;
    async fn save_progress(
        &self,
        user_id: Uuid,
        id: i64,
        progress: &RoadmapProgress,
    ) -> Result<bool, AppError>;
}

pub struct PgSavedJobRepository {
    pool: PgPool,
}

impl PgSavedJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SavedJobRepository for PgSavedJobRepository {
    async fn insert(
        &self,
        user_id: Uuid,
        job: &TieredCandidate,
    ) -> Result<Option<SavedJob>, AppError> {
        let c = &job.candidate;
        let row: Option<SavedJobRow> = sqlx::query_as(&format!(
            r#"
            INSERT INTO saved_jobs
                (user_id, job_id, title, organization, description, link, similarity, roadmap, application)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id, job_id) DO NOTHING
            RETURNING {COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&c.id)
        .bind(&c.title)
        .bind(&c.organization)
        .bind(&c.description)
        .bind(&c.link)
        .bind(c.similarity)
        .bind(job.roadmap.as_ref().map(Json))
        .bind(job.application.as_ref().map(Json))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(SavedJob::from))
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<SavedJob>, AppError> {
        let rows: Vec<SavedJobRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM saved_jobs WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(SavedJob::from).collect())
    }

    async fn get(&self, user_id: Uuid, id: i64) -> Result<Option<SavedJob>, AppError> {
        let row: Option<SavedJobRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM saved_jobs WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(SavedJob::from))
    }

    async fn find_by_job(&self, user_id: Uuid, job_id: &str) -> Result<Option<SavedJob>, AppError> {
        let row: Option<SavedJobRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM saved_jobs WHERE user_id = $1 AND job_id = $2"
        ))
        .bind(user_id)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(SavedJob::from))
    }

    async fn delete(&self, user_id: Uuid, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM saved_jobs WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn save_progress(
        &self,
        user_id: Uuid,
        id: i64,
        progress: &RoadmapProgress,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE saved_jobs SET progress = $3, updated_at = NOW() WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .bind(Json(progress))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
