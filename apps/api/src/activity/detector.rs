//! Activity change detector.
//!
//! A cheap SHA check guards the expensive path (patch collection + LLM analysis).
//! Two concurrent checks for the same stale SHA may both analyse; the later
//! fingerprint write wins and both results are equivalent.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::activity::models::{ActivityFingerprint, AnalysisResult, CodeAnalysis};
use crate::activity::prompts::{CODE_ANALYSIS_PROMPT, CODE_ANALYSIS_SYSTEM};
use crate::activity::source::ActivitySource;
use crate::activity::store::FingerprintRepository;
use crate::cache::{Cache, CacheKind};
use crate::errors::AppError;
use crate::llm_client::{complete_json, LanguageModel};
use crate::profile::models::IncomingSkill;
use crate::profile::store::ProfileStore;
use crate::strategy::roadmap::truncate;

const MAX_EVENTS: usize = 10;
const CODE_CONTEXT_LIMIT: usize = 15_000;

#[derive(Clone)]
pub struct ActivityDetector {
    source: Arc<dyn ActivitySource>,
    llm: Arc<dyn LanguageModel>,
    fingerprints: Arc<dyn FingerprintRepository>,
    profiles: ProfileStore,
    cache: Cache,
}

impl ActivityDetector {
    pub fn new(
        source: Arc<dyn ActivitySource>,
        llm: Arc<dyn LanguageModel>,
        fingerprints: Arc<dyn FingerprintRepository>,
        profiles: ProfileStore,
        cache: Cache,
    ) -> Self {
        Self {
            source,
            llm,
            fingerprints,
            profiles,
            cache,
        }
    }

    pub async fn check_and_maybe_analyze(
        &self,
        user_id: Uuid,
        github_username: &str,
    ) -> Result<AnalysisResult, AppError> {
        let current_sha = self
            .source
            .latest_commit_sha(github_username)
            .await
            .map_err(|e| AppError::Upstream(format!("activity source: {e}")))?;

        let Some(current_sha) = current_sha else {
            info!(%user_id, github_username, "no push activity found");
            return Ok(AnalysisResult::unchanged(user_id, "No recent activity found"));
        };

        let fingerprints = &self.fingerprints;
        let stored = self
            .cache
            .read_through(CacheKind::Activity, user_id, || fingerprints.get(user_id))
            .await?;

        if let Some(fp) = stored.filter(|fp| fp.last_analyzed_commit_sha == current_sha) {
            info!(%user_id, sha = %current_sha, "activity unchanged, returning cached analysis");
            return Ok(AnalysisResult::from_fingerprint(&fp));
        }

        info!(%user_id, sha = %current_sha, "new activity detected, analysing");
        self.analyze(user_id, github_username, current_sha).await
    }

    async fn analyze(
        &self,
        user_id: Uuid,
        github_username: &str,
        current_sha: String,
    ) -> Result<AnalysisResult, AppError> {
        let activity = self
            .source
            .recent_activity(github_username, MAX_EVENTS)
            .await
            .map_err(|e| AppError::Upstream(format!("activity source: {e}")))?;

        let Some(activity) = activity.filter(|a| !a.code_context.trim().is_empty()) else {
            return Ok(AnalysisResult::unchanged(
                user_id,
                "No recent code activity found on GitHub",
            ));
        };

        let prompt = CODE_ANALYSIS_PROMPT.replace(
            "{code_context}",
            truncate(&activity.code_context, CODE_CONTEXT_LIMIT),
        );
        let analysis: CodeAnalysis =
            match complete_json(self.llm.as_ref(), &prompt, CODE_ANALYSIS_SYSTEM).await {
                Ok(analysis) => analysis,
                Err(e) => {
                    warn!(%user_id, "code analysis failed: {e}");
                    return Ok(AnalysisResult::unchanged(
                        user_id,
                        "Could not analyze code context",
                    ));
                }
            };

        let incoming: Vec<IncomingSkill> = analysis
            .detected_skills
            .iter()
            .filter(|s| !s.skill.trim().is_empty())
            .map(|s| s.to_incoming())
            .collect();
        self.profiles.merge_detected(user_id, &incoming).await?;

        // Pushes landing between the two source calls are part of the analysed context.
        let analyzed_sha = activity.latest_commit_sha.clone().unwrap_or(current_sha);
        let fingerprint = ActivityFingerprint {
            user_id,
            last_analyzed_commit_sha: analyzed_sha,
            detected_skills: analysis.detected_skills,
            touched_repos: activity.touched_repos,
            tech_stack_summary: analysis.tech_stack_summary,
            narrative_message: analysis.narrative_message,
            analyzed_at: Utc::now(),
        };
        self.fingerprints.put(&fingerprint).await?;
        self.cache
            .set(CacheKind::Activity, user_id, &fingerprint)
            .await;

        info!(
            %user_id,
            skills = fingerprint.detected_skills.len(),
            events = activity.events_analyzed,
            "activity analysed"
        );
        Ok(AnalysisResult::from_fingerprint(&fingerprint))
    }
}
