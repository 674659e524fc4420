use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::llm_client::{complete_json, LanguageModel};
use crate::strategy::prompts::{ROADMAP_PROMPT, ROADMAP_SYSTEM};

const PROMPT_INPUT_LIMIT: usize = 1500;
const YOUTUBE_SEARCH: &str = "https://www.youtube.com/results";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapPlan {
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub roadmap: Vec<RoadmapDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapDay {
    pub day: u32,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub tasks: Vec<String>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub url: String,
}

impl RoadmapPlan {
    /// Minimal plan returned when generation fails.
    pub fn fallback() -> Self {
        RoadmapPlan {
            missing_skills: vec!["Advanced Concepts".to_string()],
            roadmap: vec![RoadmapDay {
                day: 1,
                topic: "Review Requirements".to_string(),
                tasks: vec!["Read Docs".to_string()],
                resources: Vec::new(),
            }],
        }
    }

    /// Caps the plan at 3 skills and 3 days and gives each day exactly one
    /// documentation link and one video-search link.
    pub fn normalized(mut self) -> Self {
        self.missing_skills.truncate(3);
        self.roadmap.truncate(3);
        for (i, day) in self.roadmap.iter_mut().enumerate() {
            day.day = i as u32 + 1;
            day.resources = normalize_resources(&day.topic, std::mem::take(&mut day.resources));
        }
        self
    }
}

fn is_video(resource: &Resource) -> bool {
    resource.url.contains("youtube.com") || resource.url.contains("youtu.be")
}

fn normalize_resources(topic: &str, resources: Vec<Resource>) -> Vec<Resource> {
    let docs = resources
        .iter()
        .find(|r| !is_video(r) && r.url.starts_with("http"))
        .cloned()
        .unwrap_or_else(|| Resource {
            name: "Docs".to_string(),
            url: search_url("https://www.google.com/search", "q", &format!("{topic} official documentation")),
        });
    let video = resources
        .into_iter()
        .find(is_video)
        .unwrap_or_else(|| Resource {
            name: "Video".to_string(),
            url: search_url(YOUTUBE_SEARCH, "search_query", &format!("{topic} tutorial")),
        });
    vec![docs, video]
}

fn search_url(base: &str, param: &str, query: &str) -> String {
    Url::parse_with_params(base, &[(param, query)])
        .map(|u| u.to_string())
        .unwrap_or_else(|_| base.to_string())
}

#[async_trait]
pub trait RoadmapGenerator: Send + Sync {
    /// Never fails; generation errors produce `RoadmapPlan::fallback()`.
    async fn generate(&self, profile_text: &str, job_description: &str) -> RoadmapPlan;
}

pub struct LlmRoadmapGenerator {
    llm: Arc<dyn LanguageModel>,
}

impl LlmRoadmapGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl RoadmapGenerator for LlmRoadmapGenerator {
    async fn generate(&self, profile_text: &str, job_description: &str) -> RoadmapPlan {
        let prompt = ROADMAP_PROMPT
            .replace("{profile}", truncate(profile_text, PROMPT_INPUT_LIMIT))
            .replace("{job}", truncate(job_description, PROMPT_INPUT_LIMIT));

        match complete_json::<RoadmapPlan>(self.llm.as_ref(), &prompt, ROADMAP_SYSTEM).await {
            Ok(plan) if !plan.roadmap.is_empty() => {
                info!(missing = ?plan.missing_skills, "roadmap generated");
                plan.normalized()
            }
            Ok(_) => {
                warn!("roadmap generation returned no days, using fallback");
                RoadmapPlan::fallback()
            }
            Err(e) => {
                warn!("roadmap generation failed, using fallback: {e}");
                RoadmapPlan::fallback()
            }
        }
    }
}

/// Truncates on a char boundary.
pub fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
