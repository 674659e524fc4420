use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::cache::{Cache, CacheKind};
use crate::errors::AppError;

/// Topic name -> self-assessed level ("weak", "okay", "strong").
pub type QuizAnswers = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PracticeProgress {
    pub solved_problem_ids: Vec<i64>,
    pub quiz_answers: QuizAnswers,
    pub total_solved: usize,
}

impl PracticeProgress {
    pub fn new(solved_problem_ids: Vec<i64>, quiz_answers: QuizAnswers) -> Self {
        let total_solved = solved_problem_ids.len();
        Self {
            solved_problem_ids,
            quiz_answers,
            total_solved,
        }
    }
}

#[derive(FromRow)]
struct ProgressRow {
    solved_problem_ids: Vec<i64>,
    quiz_answers: Json<QuizAnswers>,
}

impl From<ProgressRow> for PracticeProgress {
    fn from(row: ProgressRow) -> Self {
        PracticeProgress::new(row.solved_problem_ids, row.quiz_answers.0)
    }
}

#[async_trait]
pub trait PracticeRepository: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<Option<PracticeProgress>, AppError>;
    /// Upserts the solved list. `quiz_answers = None` keeps the stored answers.
    async fn save(
        &self,
        user_id: Uuid,
        solved_problem_ids: &[i64],
        quiz_answers: Option<&QuizAnswers>,
    ) -> Result<PracticeProgress, AppError>;
}

pub struct PgPracticeRepository {
    pool: PgPool,
}

impl PgPracticeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PracticeRepository for PgPracticeRepository {
    async fn get(&self, user_id: Uuid) -> Result<Option<PracticeProgress>, AppError> {
        let row: Option<ProgressRow> = sqlx::query_as(
            "SELECT solved_problem_ids, quiz_answers FROM practice_progress WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(PracticeProgress::from))
    }

    async fn save(
        &self,
        user_id: Uuid,
        solved_problem_ids: &[i64],
        quiz_answers: Option<&QuizAnswers>,
    ) -> Result<PracticeProgress, AppError> {
        let row: ProgressRow = sqlx::query_as(
            r#"
            INSERT INTO practice_progress (user_id, solved_problem_ids, quiz_answers, updated_at)
            VALUES ($1, $2, COALESCE($3, '{}'::jsonb), NOW())
            ON CONFLICT (user_id) DO UPDATE SET
                solved_problem_ids = EXCLUDED.solved_problem_ids,
                quiz_answers = COALESCE($3, practice_progress.quiz_answers),
                updated_at = NOW()
            RETURNING solved_problem_ids, quiz_answers
            "#,
        )
        .bind(user_id)
        .bind(solved_problem_ids)
        .bind(quiz_answers.map(Json))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }
}

/// Drops repeated ids, keeping first-seen order.
fn dedupe(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[derive(Clone)]
pub struct PracticeService {
    repo: Arc<dyn PracticeRepository>,
    cache: Cache,
}

impl PracticeService {
    pub fn new(repo: Arc<dyn PracticeRepository>, cache: Cache) -> Self {
        Self { repo, cache }
    }

    /// Read-through; a user with no stored progress gets an empty record.
    pub async fn get(&self, user_id: Uuid) -> Result<PracticeProgress, AppError> {
        let repo = &self.repo;
        let progress = self
            .cache
            .read_through(CacheKind::PracticeProgress, user_id, || repo.get(user_id))
            .await?;
        if progress.is_none() {
            debug!(%user_id, "no practice progress yet");
        }
        Ok(progress.unwrap_or_default())
    }

    /// Write-through: database first, then cache.
    pub async fn save(
        &self,
        user_id: Uuid,
        solved_problem_ids: &[i64],
        quiz_answers: Option<&QuizAnswers>,
    ) -> Result<PracticeProgress, AppError> {
        let ids = dedupe(solved_problem_ids);
        let repo = &self.repo;
        let saved = self
            .cache
            .write_through(CacheKind::PracticeProgress, user_id, || {
                repo.save(user_id, &ids, quiz_answers)
            })
            .await?;
        info!(%user_id, total_solved = saved.total_solved, "practice progress saved");
        Ok(saved)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct MemoryPractice {
        pub rows: Mutex<HashMap<Uuid, PracticeProgress>>,
        pub reads: Mutex<usize>,
        pub broken: bool,
    }

    #[async_trait]
    impl PracticeRepository for MemoryPractice {
        async fn get(&self, user_id: Uuid) -> Result<Option<PracticeProgress>, AppError> {
            *self.reads.lock().unwrap() += 1;
            Ok(self.rows.lock().unwrap().get(&user_id).cloned())
        }

        async fn save(
            &self,
            user_id: Uuid,
            solved_problem_ids: &[i64],
            quiz_answers: Option<&QuizAnswers>,
        ) -> Result<PracticeProgress, AppError> {
            if self.broken {
                return Err(AppError::Internal(anyhow::anyhow!("write timeout")));
            }
            let mut rows = self.rows.lock().unwrap();
            let answers = match quiz_answers {
                Some(answers) => answers.clone(),
                None => rows
                    .get(&user_id)
                    .map(|p| p.quiz_answers.clone())
                    .unwrap_or_default(),
            };
            let progress = PracticeProgress::new(solved_problem_ids.to_vec(), answers);
            rows.insert(user_id, progress.clone());
            Ok(progress)
        }
    }
}
