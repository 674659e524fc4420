//! Daily aggregation: one snapshot per user across jobs, hackathons and news.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::cache::{Cache, CacheKind};
use crate::daily::hot_skills::HotSkillAdvisor;
use crate::daily::snapshot::{DailySnapshot, SnapshotRepository};
use crate::errors::AppError;
use crate::matching::{MatchEngine, Namespace};
use crate::profile::models::Profile;
use crate::profile::ProfileStore;
use crate::strategy::{classify, ApplicationText, ApplicationWriter, RoadmapGenerator, TieredCandidate};

pub const JOBS_TOP_K: usize = 10;
pub const HACKATHONS_TOP_K: usize = 10;
pub const NEWS_TOP_K: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    PartialSuccess,
    NoUsers,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserFailure {
    pub user_id: Uuid,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyRunReport {
    pub status: RunStatus,
    pub users_total: usize,
    pub users_processed: usize,
    pub users_failed: usize,
    pub errors: Vec<UserFailure>,
    /// Set when the run could not start, e.g. profile enumeration failed.
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DailyRunReport {
    /// Only a total failure should surface as a failing exit status.
    pub fn is_total_failure(&self) -> bool {
        self.status == RunStatus::Failed
    }
}

/// LLM-backed writers that decorate a user's matches. Each one falls back
/// instead of failing.
#[derive(Clone)]
pub struct Enrichment {
    pub roadmaps: Arc<dyn RoadmapGenerator>,
    pub applications: Arc<dyn ApplicationWriter>,
    pub hot_skills: Arc<dyn HotSkillAdvisor>,
}

#[derive(Clone)]
pub struct DailyJob {
    profiles: ProfileStore,
    engine: MatchEngine,
    enrichment: Enrichment,
    snapshots: Arc<dyn SnapshotRepository>,
    cache: Cache,
    max_roadmaps: usize,
    concurrency: usize,
}

impl DailyJob {
    pub fn new(
        profiles: ProfileStore,
        engine: MatchEngine,
        enrichment: Enrichment,
        snapshots: Arc<dyn SnapshotRepository>,
        cache: Cache,
        max_roadmaps: usize,
        concurrency: usize,
    ) -> Self {
        Self {
            profiles,
            engine,
            enrichment,
            snapshots,
            cache,
            max_roadmaps,
            concurrency: concurrency.max(1),
        }
    }

    fn applications(&self) -> &dyn ApplicationWriter {
        self.enrichment.applications.as_ref()
    }

    /// Read-through snapshot lookup.
    pub async fn snapshot(&self, user_id: Uuid) -> Result<Option<DailySnapshot>, AppError> {
        let snapshots = &self.snapshots;
        self.cache
            .read_through(CacheKind::DailySnapshot, user_id, || snapshots.get(user_id))
            .await
    }

    /// Application text for one of today's jobs. Snapshots written before the
    /// text existed get it generated on the fly; the result is not stored.
    pub async fn application_text(
        &self,
        user_id: Uuid,
        job_id: &str,
    ) -> Result<(TieredCandidate, ApplicationText), AppError> {
        let snapshot = self
            .snapshot(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("No daily data yet. Refresh first.".to_string()))?;
        let job = snapshot
            .find_job(job_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Job {job_id}")))?;

        let text = match job.application.clone() {
            Some(text) => text,
            None => {
                let profile = self.profiles.get(user_id).await?;
                self.applications().write(&profile, &job.candidate).await
            }
        };
        Ok((job, text))
    }

    pub async fn process_user_id(&self, user_id: Uuid) -> Result<DailySnapshot, AppError> {
        let profile = self.profiles.get(user_id).await?;
        self.process_user(&profile).await
    }

    /// Embeds the profile once and reuses the vector for all three namespaces.
    pub async fn process_user(&self, profile: &Profile) -> Result<DailySnapshot, AppError> {
        let user_id = profile.user_id;
        let query = profile.query_text();
        if query.is_empty() {
            return Err(AppError::Validation(
                "Profile has no skills, roles or summary to match on".to_string(),
            ));
        }

        let vector = self
            .engine
            .embed(&query)
            .await
            .map_err(|e| AppError::Upstream(format!("profile embedding failed: {e}")))?;

        let (jobs, hackathons, news) = tokio::join!(
            self.engine.query_with_vector(&vector, Namespace::Jobs, JOBS_TOP_K),
            self.engine
                .query_with_vector(&vector, Namespace::Hackathons, HACKATHONS_TOP_K),
            self.engine.query_with_vector(&vector, Namespace::News, NEWS_TOP_K),
        );

        let generator = self.enrichment.roadmaps.as_ref();
        let mut jobs = classify(jobs, self.max_roadmaps, &query, generator).await;
        let hackathons = classify(hackathons, 0, &query, generator).await;
        let news = classify(news, 0, &query, generator).await;

        for job in &mut jobs {
            job.application = Some(self.applications().write(profile, &job.candidate).await);
        }
        let hot_skills = self.enrichment.hot_skills.suggest(profile, &jobs).await;

        let snapshot = DailySnapshot::new(user_id, jobs, hackathons, news, Utc::now())
            .with_hot_skills(hot_skills);
        self.snapshots.upsert(&snapshot).await?;
        self.cache
            .set(CacheKind::DailySnapshot, user_id, &snapshot)
            .await;

        info!(
            %user_id,
            jobs = snapshot.stats.jobs_count,
            roadmaps = snapshot.stats.jobs_with_roadmap,
            hackathons = snapshot.stats.hackathons_count,
            news = snapshot.stats.news_count,
            "daily snapshot stored"
        );
        Ok(snapshot)
    }

    /// Processes every profile with bounded concurrency. One user's failure never
    /// aborts the run; it is recorded in the report.
    pub async fn run_for_all_users(&self) -> DailyRunReport {
        let started_at = Utc::now();

        let profiles = match self.profiles.list().await {
            Ok(profiles) => profiles,
            Err(e) => {
                error!("daily run could not enumerate profiles: {e}");
                return DailyRunReport {
                    status: RunStatus::Failed,
                    users_total: 0,
                    users_processed: 0,
                    users_failed: 0,
                    errors: Vec::new(),
                    error: Some(e.to_string()),
                    started_at,
                    finished_at: Utc::now(),
                };
            }
        };
        let users_total = profiles.len();
        info!(users = users_total, concurrency = self.concurrency, "daily run started");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut set = JoinSet::new();
        for profile in profiles {
            let job = self.clone();
            let semaphore = semaphore.clone();
            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = job.process_user(&profile).await;
                (profile.user_id, result)
            });
        }

        let mut users_processed = 0;
        let mut errors = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(_))) => users_processed += 1,
                Ok((user_id, Err(e))) => {
                    warn!(%user_id, "daily processing failed: {e}");
                    errors.push(UserFailure {
                        user_id,
                        error: e.to_string(),
                    });
                }
                Err(e) => error!("daily worker task panicked: {e}"),
            }
        }
        let users_failed = users_total - users_processed;

        let status = if users_total == 0 {
            RunStatus::NoUsers
        } else if users_processed == 0 {
            RunStatus::Failed
        } else if users_failed > 0 {
            RunStatus::PartialSuccess
        } else {
            RunStatus::Success
        };
        info!(
            processed = users_processed,
            failed = users_failed,
            ?status,
            "daily run finished"
        );

        DailyRunReport {
            status,
            users_total,
            users_processed,
            users_failed,
            errors,
            error: None,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::daily::hot_skills::testing::StaticAdvisor;
    use crate::daily::snapshot::testing::MemorySnapshots;
    use crate::matching::engine::testing::{FakeEmbedder, FakeIndex};
    use crate::profile::store::testing::MemoryProfiles;
    use crate::strategy::application::testing::CountingWriter;
    use crate::strategy::tiering::testing::CountingGenerator;

    pub struct Harness {
        pub job: DailyJob,
        pub profiles: Arc<MemoryProfiles>,
        pub snapshots: Arc<MemorySnapshots>,
        pub generator: Arc<CountingGenerator>,
        pub writer: Arc<CountingWriter>,
    }

    pub fn harness(
        profiles: MemoryProfiles,
        embedder: FakeEmbedder,
        index: FakeIndex,
        snapshots: MemorySnapshots,
    ) -> Harness {
        let profiles = Arc::new(profiles);
        let snapshots = Arc::new(snapshots);
        let generator = Arc::new(CountingGenerator::default());
        let writer = Arc::new(CountingWriter::default());
        let job = DailyJob::new(
            ProfileStore::new(profiles.clone(), Cache::disabled()),
            MatchEngine::new(Arc::new(embedder), Arc::new(index)),
            Enrichment {
                roadmaps: generator.clone(),
                applications: writer.clone(),
                hot_skills: Arc::new(StaticAdvisor),
            },
            snapshots.clone(),
            Cache::disabled(),
            2,
            2,
        );
        Harness {
            job,
            profiles,
            snapshots,
            generator,
            writer,
        }
    }
}
