use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::daily::hot_skills::HotSkill;
use crate::errors::AppError;
use crate::strategy::{Tier, TieredCandidate};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotStats {
    pub jobs_count: usize,
    pub jobs_with_roadmap: usize,
    pub tier_a_jobs: usize,
    pub hackathons_count: usize,
    pub news_count: usize,
}

/// One user's consolidated daily result set. Each run replaces the previous one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySnapshot {
    pub user_id: Uuid,
    pub jobs: Vec<TieredCandidate>,
    pub hackathons: Vec<TieredCandidate>,
    pub news: Vec<TieredCandidate>,
    #[serde(default)]
    pub hot_skills: Vec<HotSkill>,
    pub stats: SnapshotStats,
    pub generated_at: DateTime<Utc>,
}

impl DailySnapshot {
    pub fn new(
        user_id: Uuid,
        jobs: Vec<TieredCandidate>,
        hackathons: Vec<TieredCandidate>,
        news: Vec<TieredCandidate>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let stats = SnapshotStats {
            jobs_count: jobs.len(),
            jobs_with_roadmap: jobs.iter().filter(|j| j.roadmap.is_some()).count(),
            tier_a_jobs: jobs.iter().filter(|j| j.tier == Tier::A).count(),
            hackathons_count: hackathons.len(),
            news_count: news.len(),
        };
        DailySnapshot {
            user_id,
            jobs,
            hackathons,
            news,
            hot_skills: Vec::new(),
            stats,
            generated_at,
        }
    }

    pub fn with_hot_skills(mut self, hot_skills: Vec<HotSkill>) -> Self {
        self.hot_skills = hot_skills;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty() && self.hackathons.is_empty() && self.news.is_empty()
    }

    pub fn find_job(&self, job_id: &str) -> Option<&TieredCandidate> {
        self.jobs.iter().find(|j| j.candidate.id == job_id)
    }
}

#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<Option<DailySnapshot>, AppError>;
    /// Replaces any existing snapshot for the user.
    async fn upsert(&self, snapshot: &DailySnapshot) -> Result<(), AppError>;
}

pub struct PgSnapshotRepository {
    pool: PgPool,
}

impl PgSnapshotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotRepository for PgSnapshotRepository {
    async fn get(&self, user_id: Uuid) -> Result<Option<DailySnapshot>, AppError> {
        let row: Option<(Json<DailySnapshot>,)> =
            sqlx::query_as("SELECT data_json FROM today_data WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(data,)| data.0))
    }

    async fn upsert(&self, snapshot: &DailySnapshot) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO today_data (user_id, data_json, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET
                data_json = EXCLUDED.data_json,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(snapshot.user_id)
        .bind(Json(snapshot))
        .bind(snapshot.generated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::roadmap::RoadmapPlan;
    use crate::strategy::tiering::testing::candidate;

    fn tiered(id: &str, similarity: f64, tier: Tier, roadmap: bool) -> TieredCandidate {
        TieredCandidate {
            candidate: candidate(id, similarity),
            tier,
            status: tier.status().to_string(),
            action: tier.action().to_string(),
            roadmap: roadmap.then(RoadmapPlan::fallback),
            application: None,
        }
    }

    #[test]
    fn test_stats_are_derived_from_content() {
        let snapshot = DailySnapshot::new(
            Uuid::new_v4(),
            vec![
                tiered("1", 0.9, Tier::A, false),
                tiered("2", 0.6, Tier::B, true),
                tiered("3", 0.35, Tier::C, false),
            ],
            vec![tiered("h", 0.5, Tier::B, false)],
            vec![],
            Utc::now(),
        );
        assert_eq!(
            snapshot.stats,
            SnapshotStats {
                jobs_count: 3,
                jobs_with_roadmap: 1,
                tier_a_jobs: 1,
                hackathons_count: 1,
                news_count: 0,
            }
        );
        assert!(!snapshot.is_empty());
        assert_eq!(snapshot.find_job("2").unwrap().tier, Tier::B);
        assert!(snapshot.find_job("h").is_none());
    }

    #[test]
    fn test_data_json_shape() {
        let snapshot = DailySnapshot::new(Uuid::new_v4(), vec![], vec![], vec![], Utc::now());
        let value = serde_json::to_value(&snapshot).unwrap();
        for key in ["jobs", "hackathons", "news", "hot_skills", "generated_at", "stats"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_rows_without_hot_skills_still_load() {
        let snapshot = DailySnapshot::new(Uuid::new_v4(), vec![], vec![], vec![], Utc::now());
        let mut value = serde_json::to_value(&snapshot).unwrap();
        value.as_object_mut().unwrap().remove("hot_skills");

        let loaded: DailySnapshot = serde_json::from_value(value).unwrap();

        assert!(loaded.hot_skills.is_empty());
    }
}
