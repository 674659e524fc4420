use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::matching::embedder::{Embedder, EmbeddingError};
use crate::matching::resolver::{
    resolve, resolve_or, DESCRIPTION_KEYS, ID_KEYS, LINK_KEYS, ORGANIZATION_KEYS, TITLE_KEYS,
};
use crate::matching::vector_index::{VectorIndex, VectorIndexError, VectorMatch};

/// Vector index namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Jobs,
    Hackathons,
    News,
    Users,
}

impl Namespace {
    /// Jobs live in the index's default namespace.
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Jobs => "",
            Namespace::Hackathons => "hackathon",
            Namespace::News => "news",
            Namespace::Users => "users",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub id: String,
    /// Clamped to [0, 1].
    pub similarity: f64,
    pub title: String,
    pub organization: String,
    pub description: String,
    pub link: String,
}

impl ScoredCandidate {
    pub fn from_match(hit: VectorMatch) -> Self {
        let md = &hit.metadata;
        let similarity = (f64::from(hit.score).clamp(0.0, 1.0) * 10_000.0).round() / 10_000.0;
        ScoredCandidate {
            id: resolve(md, ID_KEYS).unwrap_or_else(|| hit.id.clone()),
            similarity,
            title: resolve_or(md, TITLE_KEYS, "Unknown Role"),
            organization: resolve_or(md, ORGANIZATION_KEYS, "Unknown Company"),
            description: resolve_or(md, DESCRIPTION_KEYS, "No description available."),
            link: resolve_or(md, LINK_KEYS, "#"),
        }
    }
}

/// Vector Match Engine: embed, query, normalize.
#[derive(Clone)]
pub struct MatchEngine {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl MatchEngine {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Never fails: embedding or index errors are logged and yield no candidates.
    pub async fn search(
        &self,
        query_text: &str,
        namespace: Namespace,
        top_k: usize,
    ) -> Vec<ScoredCandidate> {
        match self.embedder.embed(query_text).await {
            Ok(vector) => self.query_with_vector(&vector, namespace, top_k).await,
            Err(e) => {
                warn!(namespace = namespace.as_str(), "search embedding failed: {e}");
                Vec::new()
            }
        }
    }

    /// Query with a precomputed embedding. Index errors yield no candidates.
    pub async fn query_with_vector(
        &self,
        vector: &[f32],
        namespace: Namespace,
        top_k: usize,
    ) -> Vec<ScoredCandidate> {
        match self.index.query(vector, top_k, namespace.as_str(), None).await {
            Ok(matches) => {
                debug!(namespace = namespace.as_str(), hits = matches.len(), "vector query");
                matches.into_iter().map(ScoredCandidate::from_match).collect()
            }
            Err(e) => {
                warn!(namespace = namespace.as_str(), "vector query failed: {e}");
                Vec::new()
            }
        }
    }

    /// Embedding that propagates failure, for callers that must count it.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embedder.embed(text).await
    }

    pub async fn upsert(
        &self,
        id: &str,
        vector: &[f32],
        metadata: Value,
        namespace: Namespace,
    ) -> Result<(), VectorIndexError> {
        self.index
            .upsert(id, vector, metadata, namespace.as_str())
            .await
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::testing::{FakeEmbedder, FakeIndex};
    use super::*;

    #[tokio::test]
    async fn test_search_normalizes_heterogeneous_metadata() {
        let index = FakeIndex::with(
            Namespace::Jobs,
            vec![
                (
                    "vec-1",
                    0.91,
                    json!({"job_id": 42, "title": "Rust Engineer", "company_name": "Ferrous", "link_to_apply": "https://jobs/42"}),
                ),
                ("vec-2", 0.55, json!({"description": "Data work"})),
            ],
        );
        let engine = MatchEngine::new(Arc::new(FakeEmbedder::default()), Arc::new(index));

        let results = engine.search("Rust, Go", Namespace::Jobs, 5).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "42");
        assert_eq!(results[0].organization, "Ferrous");
        assert_eq!(results[0].link, "https://jobs/42");
        assert_eq!(results[1].id, "vec-2");
        assert_eq!(results[1].title, "Unknown Role");
        assert_eq!(results[1].description, "Data work");
    }

    #[tokio::test]
    async fn test_search_degrades_on_embedding_failure() {
        let engine = MatchEngine::new(
            Arc::new(FakeEmbedder::failing_on("boom")),
            Arc::new(FakeIndex::default()),
        );
        assert!(engine.search("boom", Namespace::Jobs, 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_search_degrades_on_index_failure() {
        let index = FakeIndex {
            fail: true,
            ..Default::default()
        };
        let engine = MatchEngine::new(Arc::new(FakeEmbedder::default()), Arc::new(index));
        assert!(engine.search("Rust", Namespace::News, 5).await.is_empty());
    }

    #[test]
    fn test_similarity_is_clamped() {
        let candidate = ScoredCandidate::from_match(VectorMatch {
            id: "x".to_string(),
            score: 1.2,
            metadata: Default::default(),
        });
        assert_eq!(candidate.similarity, 1.0);
    }
}
