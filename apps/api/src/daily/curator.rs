//! Picks the digest's top items per category.
//!
//! `LlmCurator` asks the model for picks; `ScoreCurator` is the deterministic
//! highest-score-first selection used when the LLM is unavailable or fails.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::daily::prompts::{CURATION_PROMPT, CURATION_SYSTEM};
use crate::daily::snapshot::DailySnapshot;
use crate::llm_client::{complete_json, LanguageModel, LlmError};
use crate::profile::models::Profile;
use crate::strategy::TieredCandidate;

pub const PICKS_PER_CATEGORY: usize = 2;
const LISTED_JOBS: usize = 6;
const LISTED_HACKATHONS: usize = 6;
const LISTED_NEWS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DigestSelection {
    pub jobs: Vec<TieredCandidate>,
    pub hackathons: Vec<TieredCandidate>,
    pub news: Vec<TieredCandidate>,
}

impl DigestSelection {
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty() && self.hackathons.is_empty() && self.news.is_empty()
    }
}

#[async_trait]
pub trait Curator: Send + Sync {
    async fn curate(
        &self,
        profile: &Profile,
        snapshot: &DailySnapshot,
    ) -> Result<DigestSelection, LlmError>;
}

fn top_by_score(items: &[TieredCandidate]) -> Vec<TieredCandidate> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| b.candidate.similarity.total_cmp(&a.candidate.similarity));
    sorted.truncate(PICKS_PER_CATEGORY);
    sorted
}

fn first(items: &[TieredCandidate]) -> Vec<TieredCandidate> {
    items.iter().take(PICKS_PER_CATEGORY).cloned().collect()
}

pub struct ScoreCurator;

impl ScoreCurator {
    /// Jobs and hackathons by score; news keeps its feed order.
    pub fn select(snapshot: &DailySnapshot) -> DigestSelection {
        DigestSelection {
            jobs: top_by_score(&snapshot.jobs),
            hackathons: top_by_score(&snapshot.hackathons),
            news: first(&snapshot.news),
        }
    }
}

#[async_trait]
impl Curator for ScoreCurator {
    async fn curate(
        &self,
        _profile: &Profile,
        snapshot: &DailySnapshot,
    ) -> Result<DigestSelection, LlmError> {
        Ok(Self::select(snapshot))
    }
}

fn default_picks() -> Vec<usize> {
    vec![1, 2]
}

#[derive(Debug, Deserialize)]
struct Picks {
    #[serde(default = "default_picks")]
    jobs: Vec<usize>,
    #[serde(default = "default_picks")]
    hackathons: Vec<usize>,
    #[serde(default = "default_picks")]
    news: Vec<usize>,
}

/// Maps 1-based picks onto `items`. Out-of-range and repeated picks are skipped;
/// if none survive, the first items are used.
fn apply_picks(items: &[TieredCandidate], picks: &[usize]) -> Vec<TieredCandidate> {
    let mut seen = HashSet::new();
    let selected: Vec<TieredCandidate> = picks
        .iter()
        .filter_map(|&i| i.checked_sub(1).filter(|idx| *idx < items.len()))
        .filter(|idx| seen.insert(*idx))
        .take(PICKS_PER_CATEGORY)
        .map(|idx| items[idx].clone())
        .collect();
    if selected.is_empty() {
        first(items)
    } else {
        selected
    }
}

fn numbered(items: &[TieredCandidate], limit: usize, with_org: &str, empty: &str) -> String {
    let lines: Vec<String> = items
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, item)| {
            let c = &item.candidate;
            if with_org.is_empty() {
                format!("{}. {}", i + 1, c.title)
            } else {
                format!(
                    "{}. {} {} {} (Score: {:.2})",
                    i + 1,
                    c.title,
                    with_org,
                    c.organization,
                    c.similarity
                )
            }
        })
        .collect();
    if lines.is_empty() {
        empty.to_string()
    } else {
        lines.join("\n")
    }
}

pub struct LlmCurator {
    llm: Arc<dyn LanguageModel>,
}

impl LlmCurator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    fn prompt(profile: &Profile, snapshot: &DailySnapshot) -> String {
        let skills = if profile.skills.is_empty() {
            "Various tech skills".to_string()
        } else {
            profile.skills.iter().take(8).cloned().collect::<Vec<_>>().join(", ")
        };
        let roles = if profile.target_roles.is_empty() {
            "Software Developer".to_string()
        } else {
            profile.target_roles.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
        };
        CURATION_PROMPT
            .replace("{name}", profile.display_name())
            .replace("{skills}", &skills)
            .replace("{roles}", &roles)
            .replace(
                "{jobs}",
                &numbered(&snapshot.jobs, LISTED_JOBS, "at", "No jobs available"),
            )
            .replace(
                "{hackathons}",
                &numbered(&snapshot.hackathons, LISTED_HACKATHONS, "by", "No hackathons available"),
            )
            .replace(
                "{news}",
                &numbered(&snapshot.news, LISTED_NEWS, "", "No news available"),
            )
    }
}

#[async_trait]
impl Curator for LlmCurator {
    async fn curate(
        &self,
        profile: &Profile,
        snapshot: &DailySnapshot,
    ) -> Result<DigestSelection, LlmError> {
        if snapshot.is_empty() {
            return Ok(DigestSelection::default());
        }
        let picks: Picks = complete_json(
            self.llm.as_ref(),
            &Self::prompt(profile, snapshot),
            CURATION_SYSTEM,
        )
        .await?;
        Ok(DigestSelection {
            jobs: apply_picks(&snapshot.jobs, &picks.jobs),
            hackathons: apply_picks(&snapshot.hackathons, &picks.hackathons),
            news: apply_picks(&snapshot.news, &picks.news),
        })
    }
}

/// Tries `primary` when present, otherwise or on failure selects by score.
pub async fn curate_or_fallback(
    primary: Option<&dyn Curator>,
    profile: &Profile,
    snapshot: &DailySnapshot,
) -> DigestSelection {
    if let Some(curator) = primary {
        match curator.curate(profile, snapshot).await {
            Ok(selection) => return selection,
            Err(e) => warn!(user_id = %profile.user_id, "digest curation failed, using score order: {e}"),
        }
    }
    ScoreCurator::select(snapshot)
}
