use anyhow::{Context, Result};

use crate::strategy::tiering::DEFAULT_MAX_ROADMAPS;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub embedding_api_url: String,
    pub embedding_api_key: String,
    pub embedding_model: String,
    pub vector_index_host: String,
    pub vector_index_api_key: String,
    pub github_token: Option<String>,
    pub cron_secret: Option<String>,
    pub mail: Option<MailConfig>,
    pub speech: Option<SpeechConfig>,
    pub max_roadmaps: usize,
    pub daily_job_concurrency: usize,
    pub interview_profile: String,
    pub audio_cooldown_secs: f64,
    pub session_backend: SessionBackend,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub api_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackend {
    Redis,
    Memory,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let mail = match (optional_env("MAIL_API_URL"), optional_env("MAIL_API_KEY")) {
            (Some(api_url), Some(api_key)) => Some(MailConfig {
                api_url,
                api_key,
                from: optional_env("MAIL_FROM")
                    .unwrap_or_else(|| "CareerFlow <digest@careerflow.dev>".to_string()),
            }),
            _ => None,
        };

        let speech = match (optional_env("SPEECH_API_URL"), optional_env("SPEECH_API_KEY")) {
            (Some(api_url), Some(api_key)) => Some(SpeechConfig { api_url, api_key }),
            _ => None,
        };

        let session_backend = match optional_env("SESSION_BACKEND").as_deref() {
            None | Some("redis") => SessionBackend::Redis,
            Some("memory") => SessionBackend::Memory,
            Some(other) => anyhow::bail!("SESSION_BACKEND must be 'redis' or 'memory', got '{other}'"),
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            embedding_api_url: require_env("EMBEDDING_API_URL")?,
            embedding_api_key: require_env("EMBEDDING_API_KEY")?,
            embedding_model: optional_env("EMBEDDING_MODEL")
                .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            vector_index_host: require_env("VECTOR_INDEX_HOST")?,
            vector_index_api_key: require_env("VECTOR_INDEX_API_KEY")?,
            github_token: optional_env("GITHUB_TOKEN"),
            cron_secret: optional_env("CRON_SECRET"),
            mail,
            speech,
            max_roadmaps: parse_env("MAX_ROADMAPS", DEFAULT_MAX_ROADMAPS)?,
            daily_job_concurrency: parse_env("DAILY_JOB_CONCURRENCY", 4)?,
            interview_profile: optional_env("INTERVIEW_PROFILE")
                .unwrap_or_else(|| "standard".to_string()),
            audio_cooldown_secs: parse_env("AUDIO_COOLDOWN_SECONDS", 1.0)?,
            session_backend,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
