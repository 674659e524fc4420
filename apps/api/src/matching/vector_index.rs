use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VectorIndexError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// One nearest-neighbour hit.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: &str,
        filter: Option<&Value>,
    ) -> Result<Vec<VectorMatch>, VectorIndexError>;

    async fn upsert(
        &self,
        id: &str,
        vector: &[f32],
        metadata: Value,
        namespace: &str,
    ) -> Result<(), VectorIndexError>;
}

/// Pinecone data-plane client (`/query`, `/vectors/upsert`).
pub struct PineconeIndex {
    client: Client,
    host: String,
    api_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    namespace: &'a str,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a Value>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<VectorMatch>,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: [UpsertVector<'a>; 1],
    namespace: &'a str,
}

#[derive(Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: Value,
}

impl PineconeIndex {
    pub fn new(host: String, api_key: String) -> Self {
        let host = if host.starts_with("http") {
            host
        } else {
            format!("https://{host}")
        };
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            host: host.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response, VectorIndexError> {
        let response = self
            .client
            .post(format!("{}{path}", self.host))
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(VectorIndexError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: &str,
        filter: Option<&Value>,
    ) -> Result<Vec<VectorMatch>, VectorIndexError> {
        let request = QueryRequest {
            vector,
            top_k,
            namespace,
            include_metadata: true,
            filter,
        };
        let body: QueryResponse = self.post("/query", &request).await?.json().await?;
        Ok(body.matches)
    }

    async fn upsert(
        &self,
        id: &str,
        vector: &[f32],
        metadata: Value,
        namespace: &str,
    ) -> Result<(), VectorIndexError> {
        let request = UpsertRequest {
            vectors: [UpsertVector {
                id,
                values: vector,
                metadata,
            }],
            namespace,
        };
        self.post("/vectors/upsert", &request).await?;
        Ok(())
    }
}
