//! Tiering & roadmap policy.
//!
//! | similarity      | tier | status            | action          |
//! |-----------------|------|-------------------|-----------------|
//! | >= 0.85         | A    | Ready to Deploy   | Auto-Apply      |
//! | [0.40, 0.85)    | B    | Gap Detected      | Start Roadmap   |
//! | [0.30, 0.40)    | C    | Low Match         | Ignore          |
//! | < 0.30          | dropped                                   |
//!
//! Only the first `max_roadmaps` Tier B candidates, in input order, get a roadmap.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::matching::ScoredCandidate;
use crate::strategy::application::ApplicationText;
use crate::strategy::roadmap::{RoadmapGenerator, RoadmapPlan};

pub const TIER_A_THRESHOLD: f64 = 0.85;
pub const TIER_B_THRESHOLD: f64 = 0.40;
pub const NOISE_FLOOR: f64 = 0.30;
pub const DEFAULT_MAX_ROADMAPS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    A,
    B,
    C,
}

impl Tier {
    /// `None` below the noise floor.
    pub fn for_similarity(similarity: f64) -> Option<Tier> {
        if similarity >= TIER_A_THRESHOLD {
            Some(Tier::A)
        } else if similarity >= TIER_B_THRESHOLD {
            Some(Tier::B)
        } else if similarity >= NOISE_FLOOR {
            Some(Tier::C)
        } else {
            None
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Tier::A => "Ready to Deploy",
            Tier::B => "Gap Detected",
            Tier::C => "Low Match",
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Tier::A => "Auto-Apply",
            Tier::B => "Start Roadmap",
            Tier::C => "Ignore",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TieredCandidate {
    #[serde(flatten)]
    pub candidate: ScoredCandidate,
    pub tier: Tier,
    pub status: String,
    pub action: String,
    pub roadmap: Option<RoadmapPlan>,
    /// Attached to daily job matches only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<ApplicationText>,
}

impl TieredCandidate {
    fn new(candidate: ScoredCandidate, tier: Tier, roadmap: Option<RoadmapPlan>) -> Self {
        TieredCandidate {
            candidate,
            tier,
            status: tier.status().to_string(),
            action: tier.action().to_string(),
            roadmap,
            application: None,
        }
    }
}

/// Text the roadmap generator sees for a job.
fn job_description(candidate: &ScoredCandidate) -> String {
    format!(
        "{} at {}\n{}",
        candidate.title, candidate.organization, candidate.description
    )
}

/// Classifies candidates and attaches roadmaps to at most `max_roadmaps` Tier B entries.
/// The result is sorted by similarity, highest first.
pub async fn classify(
    candidates: Vec<ScoredCandidate>,
    max_roadmaps: usize,
    profile_text: &str,
    generator: &dyn RoadmapGenerator,
) -> Vec<TieredCandidate> {
    let mut roadmaps_left = max_roadmaps;
    let mut tiered = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let Some(tier) = Tier::for_similarity(candidate.similarity) else {
            debug!(id = %candidate.id, similarity = candidate.similarity, "dropped below noise floor");
            continue;
        };
        let roadmap = if tier == Tier::B && roadmaps_left > 0 {
            roadmaps_left -= 1;
            Some(
                generator
                    .generate(profile_text, &job_description(&candidate))
                    .await,
            )
        } else {
            None
        };
        tiered.push(TieredCandidate::new(candidate, tier, roadmap));
    }

    tiered.sort_by(|a, b| b.candidate.similarity.total_cmp(&a.candidate.similarity));
    tiered
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    pub struct CountingGenerator {
        pub calls: AtomicUsize,
    }

    impl CountingGenerator {
        pub fn count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RoadmapGenerator for CountingGenerator {
        async fn generate(&self, _profile_text: &str, _job_description: &str) -> RoadmapPlan {
            self.calls.fetch_add(1, Ordering::SeqCst);
            RoadmapPlan::fallback()
        }
    }

    /// Tiered by score, without a roadmap. Scores below the noise floor land in C.
    pub fn tiered(id: &str, similarity: f64) -> TieredCandidate {
        let tier = Tier::for_similarity(similarity).unwrap_or(Tier::C);
        TieredCandidate::new(candidate(id, similarity), tier, None)
    }

    pub fn candidate(id: &str, similarity: f64) -> ScoredCandidate {
        ScoredCandidate {
            id: id.to_string(),
            similarity,
            title: format!("Role {id}"),
            organization: "Acme".to_string(),
            description: "Build things".to_string(),
            link: "#".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{candidate, CountingGenerator};
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(Tier::for_similarity(1.0), Some(Tier::A));
        assert_eq!(Tier::for_similarity(0.85), Some(Tier::A));
        assert_eq!(Tier::for_similarity(0.8499), Some(Tier::B));
        assert_eq!(Tier::for_similarity(0.40), Some(Tier::B));
        assert_eq!(Tier::for_similarity(0.3999), Some(Tier::C));
        assert_eq!(Tier::for_similarity(0.30), Some(Tier::C));
        assert_eq!(Tier::for_similarity(0.2999), None);
        assert_eq!(Tier::for_similarity(0.0), None);
    }

    #[test]
    fn test_every_score_lands_in_at_most_one_tier() {
        for step in 0..=1000 {
            let s = f64::from(step) / 1000.0;
            let tiers = [
                s >= TIER_A_THRESHOLD,
                (TIER_B_THRESHOLD..TIER_A_THRESHOLD).contains(&s),
                (NOISE_FLOOR..TIER_B_THRESHOLD).contains(&s),
            ];
            let hits = tiers.iter().filter(|t| **t).count();
            assert_eq!(hits, usize::from(s >= NOISE_FLOOR), "score {s}");
            assert_eq!(Tier::for_similarity(s).is_some(), hits == 1);
        }
    }

    #[tokio::test]
    async fn test_scenario_three_candidates() {
        let generator = CountingGenerator::default();
        let input = vec![candidate("a", 0.90), candidate("b", 0.50), candidate("c", 0.20)];

        let out = classify(input, 2, "Rust", &generator).await;

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].tier, Tier::A);
        assert_eq!(out[0].action, "Auto-Apply");
        assert!(out[0].roadmap.is_none());
        assert_eq!(out[1].tier, Tier::B);
        assert!(out[1].roadmap.is_some());
        assert_eq!(generator.count(), 1);
    }

    #[tokio::test]
    async fn test_roadmaps_bounded_to_first_tier_b_in_input_order() {
        let generator = CountingGenerator::default();
        let input = vec![
            candidate("b1", 0.45),
            candidate("b2", 0.80),
            candidate("b3", 0.60),
            candidate("b4", 0.70),
            candidate("c1", 0.35),
        ];

        let out = classify(input, 2, "Rust", &generator).await;

        assert_eq!(generator.count(), 2);
        let with_roadmap: Vec<&str> = out
            .iter()
            .filter(|t| t.roadmap.is_some())
            .map(|t| t.candidate.id.as_str())
            .collect();
        assert_eq!(with_roadmap, vec!["b2", "b1"]);
        let scores: Vec<f64> = out.iter().map(|t| t.candidate.similarity).collect();
        assert_eq!(scores, vec![0.80, 0.70, 0.60, 0.45, 0.35]);
        assert_eq!(out.last().unwrap().tier, Tier::C);
    }

    #[tokio::test]
    async fn test_zero_max_roadmaps_never_generates() {
        let generator = CountingGenerator::default();
        let out = classify(vec![candidate("b", 0.5)], 0, "", &generator).await;
        assert!(out[0].roadmap.is_none());
        assert_eq!(generator.count(), 0);
    }

    #[test]
    fn test_tiered_candidate_serializes_flat() {
        let tiered = TieredCandidate::new(candidate("x", 0.9), Tier::A, None);
        let value = serde_json::to_value(&tiered).unwrap();
        assert_eq!(value["id"], "x");
        assert_eq!(value["tier"], "A");
        assert_eq!(value["status"], "Ready to Deploy");
        assert!(value["roadmap"].is_null());
        assert!(value.get("application").is_none());
    }
}
