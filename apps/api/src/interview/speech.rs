use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::SpeechConfig;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Speech API error {status}: {message}")]
    Api { status: u16, message: String },
}

/// Speech-to-text and text-to-speech for voice interviews.
#[async_trait]
pub trait SpeechService: Send + Sync {
    async fn transcribe(&self, audio: Bytes, content_type: &str) -> Result<String, SpeechError>;
    async fn synthesize(&self, text: &str) -> Result<Bytes, SpeechError>;
}

#[derive(Deserialize)]
struct TranscribeResponse {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
}

pub struct HttpSpeechService {
    client: Client,
    config: SpeechConfig,
}

impl HttpSpeechService {
    pub fn new(config: SpeechConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.api_url.trim_end_matches('/'))
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, SpeechError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(SpeechError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl SpeechService for HttpSpeechService {
    async fn transcribe(&self, audio: Bytes, content_type: &str) -> Result<String, SpeechError> {
        let size = audio.len();
        let response = self
            .client
            .post(self.url("transcribe"))
            .bearer_auth(&self.config.api_key)
            .header(CONTENT_TYPE, content_type)
            .body(audio)
            .send()
            .await?;
        let body: TranscribeResponse = check(response).await?.json().await?;
        debug!(bytes = size, chars = body.text.len(), "transcribed audio");
        Ok(body.text.trim().to_string())
    }

    async fn synthesize(&self, text: &str) -> Result<Bytes, SpeechError> {
        let response = self
            .client
            .post(self.url("synthesize"))
            .bearer_auth(&self.config.api_key)
            .json(&SynthesizeRequest { text })
            .send()
            .await?;
        Ok(check(response).await?.bytes().await?)
    }
}
