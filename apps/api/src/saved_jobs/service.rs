//! Saved jobs: bookmarking daily matches, tracking roadmap progress and
//! folding a finished roadmap's skills back into the profile.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::daily::DailyJob;
use crate::errors::AppError;
use crate::llm_client::{complete_json, LanguageModel};
use crate::profile::models::{IncomingSkill, SkillSource};
use crate::profile::ProfileStore;
use crate::saved_jobs::prompts::{ROADMAP_SKILLS_PROMPT, ROADMAP_SKILLS_SYSTEM};
use crate::saved_jobs::store::{NodeProgress, RoadmapProgress, SavedJob, SavedJobRepository};
use crate::strategy::roadmap::RoadmapPlan;

const MAX_ROADMAP_SKILLS: usize = 8;
const ROADMAP_SKILL_LEVEL: &str = "beginner";

/// Node ids of a roadmap, one per day.
pub fn node_ids(plan: &RoadmapPlan) -> Vec<String> {
    plan.roadmap.iter().map(|d| format!("day-{}", d.day)).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    pub progress: RoadmapProgress,
    pub total_nodes: usize,
    pub completed_nodes: usize,
    /// One decimal place.
    pub completion_percentage: f64,
}

impl ProgressReport {
    /// Progress entries for nodes no longer in the roadmap are ignored.
    pub fn for_job(job: &SavedJob) -> Self {
        let nodes = job.roadmap.as_ref().map(node_ids).unwrap_or_default();
        let completed_nodes = nodes
            .iter()
            .filter(|id| job.progress.get(*id).is_some_and(|p| p.completed))
            .count();
        let completion_percentage = if nodes.is_empty() {
            0.0
        } else {
            (completed_nodes as f64 * 1000.0 / nodes.len() as f64).round() / 10.0
        };
        ProgressReport {
            progress: job.progress.clone(),
            total_nodes: nodes.len(),
            completed_nodes,
            completion_percentage,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total_nodes > 0 && self.completed_nodes == self.total_nodes
    }
}

#[derive(Debug, Serialize)]
pub struct SavedCheck {
    pub is_saved: bool,
    pub saved_job_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CompletionOutcome {
    pub new_skills_added: Vec<String>,
    pub total_skills: usize,
}

#[derive(Deserialize)]
struct RoadmapSkills {
    #[serde(default)]
    skills: Vec<String>,
}

fn roadmap_text(plan: &RoadmapPlan) -> String {
    plan.roadmap
        .iter()
        .map(|d| format!("Day {}: {} ({})", d.day, d.topic, d.tasks.join("; ")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Trims, drops blanks and anything the profile already has (case-insensitive),
/// and keeps the first spelling of repeated names.
fn new_skills(candidates: Vec<String>, known: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = known.iter().map(|s| s.to_lowercase()).collect();
    candidates
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .take(MAX_ROADMAP_SKILLS)
        .collect()
}

#[derive(Clone)]
pub struct SavedJobService {
    repo: Arc<dyn SavedJobRepository>,
    daily: DailyJob,
    profiles: ProfileStore,
    llm: Arc<dyn LanguageModel>,
}

impl SavedJobService {
    pub fn new(
        repo: Arc<dyn SavedJobRepository>,
        daily: DailyJob,
        profiles: ProfileStore,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            repo,
            daily,
            profiles,
            llm,
        }
    }

    /// Copies a job out of the user's current daily snapshot.
    pub async fn save(&self, user_id: Uuid, job_id: &str) -> Result<SavedJob, AppError> {
        let snapshot = self
            .daily
            .snapshot(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("No daily data yet. Refresh first.".to_string()))?;
        let job = snapshot
            .find_job(job_id)
            .ok_or_else(|| AppError::NotFound(format!("Job {job_id}")))?;

        let saved = self
            .repo
            .insert(user_id, job)
            .await?
            .ok_or_else(|| AppError::Conflict(format!("Job {job_id} is already saved")))?;
        info!(%user_id, job_id, saved_job_id = saved.id, "job saved");
        Ok(saved)
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<SavedJob>, AppError> {
        self.repo.list(user_id).await
    }

    pub async fn check(&self, user_id: Uuid, job_id: &str) -> Result<SavedCheck, AppError> {
        let saved = self.repo.find_by_job(user_id, job_id).await?;
        Ok(SavedCheck {
            is_saved: saved.is_some(),
            saved_job_id: saved.map(|s| s.id),
        })
    }

    pub async fn remove(&self, user_id: Uuid, id: i64) -> Result<(), AppError> {
        if !self.repo.delete(user_id, id).await? {
            return Err(AppError::NotFound(format!("Saved job {id}")));
        }
        info!(%user_id, saved_job_id = id, "saved job removed");
        Ok(())
    }

    async fn load(&self, user_id: Uuid, id: i64) -> Result<SavedJob, AppError> {
        self.repo
            .get(user_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Saved job {id}")))
    }

    pub async fn progress(&self, user_id: Uuid, id: i64) -> Result<ProgressReport, AppError> {
        Ok(ProgressReport::for_job(&self.load(user_id, id).await?))
    }

    pub async fn update_progress(
        &self,
        user_id: Uuid,
        id: i64,
        node_id: &str,
        completed: bool,
    ) -> Result<ProgressReport, AppError> {
        let mut job = self.load(user_id, id).await?;
        let plan = job
            .roadmap
            .as_ref()
            .ok_or_else(|| AppError::Validation("This saved job has no roadmap".to_string()))?;
        if !node_ids(plan).iter().any(|n| n == node_id) {
            return Err(AppError::Validation(format!("Unknown roadmap node {node_id}")));
        }

        job.progress.insert(
            node_id.to_string(),
            NodeProgress {
                completed,
                updated_at: Utc::now(),
            },
        );
        if !self.repo.save_progress(user_id, id, &job.progress).await? {
            return Err(AppError::NotFound(format!("Saved job {id}")));
        }
        Ok(ProgressReport::for_job(&job))
    }

    /// Adds the skills a fully completed roadmap taught to the profile.
    pub async fn complete(&self, user_id: Uuid, id: i64) -> Result<CompletionOutcome, AppError> {
        let job = self.load(user_id, id).await?;
        let plan = job
            .roadmap
            .as_ref()
            .ok_or_else(|| AppError::Validation("This saved job has no roadmap".to_string()))?;
        let report = ProgressReport::for_job(&job);
        if !report.is_complete() {
            return Err(AppError::Conflict(format!(
                "Roadmap is {}% complete",
                report.completion_percentage
            )));
        }

        let profile = self.profiles.get(user_id).await?;
        let learned = new_skills(self.roadmap_skills(&job.title, plan).await, &profile.skills);
        if learned.is_empty() {
            return Ok(CompletionOutcome {
                new_skills_added: learned,
                total_skills: profile.skills.len(),
            });
        }

        let evidence = format!("Completed learning roadmap for {}", job.title);
        let incoming: Vec<IncomingSkill> = learned
            .iter()
            .map(|name| IncomingSkill {
                name: name.clone(),
                source: SkillSource::Roadmap,
                level: Some(ROADMAP_SKILL_LEVEL.to_string()),
                evidence: evidence.clone(),
            })
            .collect();
        let updated = self.profiles.merge_detected(user_id, &incoming).await?;
        info!(%user_id, saved_job_id = id, added = learned.len(), "roadmap skills merged");

        Ok(CompletionOutcome {
            new_skills_added: learned,
            total_skills: updated.skills.len(),
        })
    }

    /// Falls back to the roadmap's own missing-skill list.
    async fn roadmap_skills(&self, title: &str, plan: &RoadmapPlan) -> Vec<String> {
        let prompt = ROADMAP_SKILLS_PROMPT
            .replace("{title}", title)
            .replace("{roadmap}", &roadmap_text(plan));
        match complete_json::<RoadmapSkills>(self.llm.as_ref(), &prompt, ROADMAP_SKILLS_SYSTEM).await
        {
            Ok(reply) if reply.skills.iter().any(|s| !s.trim().is_empty()) => reply.skills,
            Ok(_) => {
                warn!("roadmap skill extraction came back empty, using missing skills");
                plan.missing_skills.clone()
            }
            Err(e) => {
                warn!("roadmap skill extraction failed, using missing skills: {e}");
                plan.missing_skills.clone()
            }
        }
    }
}
