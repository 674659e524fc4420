use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::activity::models::RecentActivity;
use crate::errors::AppError;
use crate::strategy::roadmap::truncate;

const GITHUB_API: &str = "https://api.github.com";
const USER_AGENT: &str = "careerflow-api";
const PATCH_LIMIT: usize = 2000;
const COMMIT_MESSAGE_LIMIT: usize = 100;

const CODE_EXTENSIONS: &[&str] = &[
    ".py", ".js", ".ts", ".tsx", ".jsx", ".go", ".rs", ".java", ".cpp", ".c", ".h", ".rb",
    ".php", ".swift", ".kt", ".scala", ".sql", ".graphql", ".proto", ".yaml", ".yml", ".json",
    ".toml", ".sh", ".bash", ".zsh", ".ipynb", ".md",
];

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// External source of code activity.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Cheap: the most recent pushed commit SHA, if any.
    async fn latest_commit_sha(&self, username: &str) -> Result<Option<String>, ActivityError>;

    /// Expensive: recent push events with their code patches.
    async fn recent_activity(
        &self,
        username: &str,
        max_events: usize,
    ) -> Result<Option<RecentActivity>, ActivityError>;
}

/// Accepts `https://github.com/user`, `github.com/user/repo`, `www.github.com/user/`.
pub fn extract_username(github_url: &str) -> Result<String, AppError> {
    let invalid = || {
        AppError::Validation(format!(
            "Invalid GitHub URL '{github_url}'. Expected: https://github.com/username"
        ))
    };
    let url = github_url.trim().trim_end_matches('/');
    let url = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let url = url.strip_prefix("www.").unwrap_or(url);
    let rest = url.strip_prefix("github.com/").ok_or_else(invalid)?;
    match rest.split('/').next() {
        Some(user) if !user.is_empty() => Ok(user.to_string()),
        _ => Err(invalid()),
    }
}

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(rename = "type")]
    kind: String,
    repo: EventRepo,
    #[serde(default)]
    payload: PushPayload,
}

#[derive(Debug, Deserialize)]
struct EventRepo {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct PushPayload {
    #[serde(default)]
    head: Option<String>,
    #[serde(default)]
    commits: Vec<PushCommit>,
}

impl PushPayload {
    fn head_sha(&self) -> Option<String> {
        self.head
            .clone()
            .or_else(|| self.commits.last().map(|c| c.sha.clone()))
    }
}

#[derive(Debug, Deserialize)]
struct PushCommit {
    sha: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    #[serde(default)]
    files: Vec<CommitFile>,
}

#[derive(Debug, Deserialize)]
struct CommitFile {
    filename: String,
    #[serde(default)]
    patch: Option<String>,
}

pub struct GithubActivitySource {
    client: Client,
    token: Option<String>,
}

impl GithubActivitySource {
    pub fn new(token: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
            token,
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let request = self
            .client
            .get(format!("{GITHUB_API}{path}"))
            .header("Accept", "application/vnd.github+json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn fetch<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ActivityError> {
        let response = self.get(path).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ActivityError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.json().await?)
    }

    async fn push_events(&self, username: &str) -> Result<Vec<Event>, ActivityError> {
        let events: Vec<Event> = self
            .fetch(&format!("/users/{username}/events/public?per_page=100"))
            .await?;
        Ok(events.into_iter().filter(|e| e.kind == "PushEvent").collect())
    }
}

#[async_trait]
impl ActivitySource for GithubActivitySource {
    async fn latest_commit_sha(&self, username: &str) -> Result<Option<String>, ActivityError> {
        let events = self.push_events(username).await?;
        Ok(events.iter().find_map(|e| e.payload.head_sha()))
    }

    async fn recent_activity(
        &self,
        username: &str,
        max_events: usize,
    ) -> Result<Option<RecentActivity>, ActivityError> {
        let events = self.push_events(username).await?;
        let latest_commit_sha = events.iter().find_map(|e| e.payload.head_sha());

        let mut parts = Vec::new();
        let mut touched_repos: Vec<String> = Vec::new();
        let mut events_analyzed = 0;

        for event in events.iter().take(max_events) {
            events_analyzed += 1;
            let repo = &event.repo.name;
            if !touched_repos.contains(repo) {
                touched_repos.push(repo.clone());
            }

            for commit in &event.payload.commits {
                let detail: CommitDetail = match self
                    .fetch(&format!("/repos/{repo}/commits/{}", commit.sha))
                    .await
                {
                    Ok(detail) => detail,
                    Err(e) => {
                        // Private, force-pushed or deleted commits are skipped.
                        warn!(%repo, sha = %commit.sha, "could not fetch commit: {e}");
                        continue;
                    }
                };
                let message = truncate(&commit.message, COMMIT_MESSAGE_LIMIT);
                for file in detail.files.iter().filter(|f| is_code_file(&f.filename)) {
                    match &file.patch {
                        Some(patch) => parts.push(format!(
                            "--- REPO: {repo} | FILE: {} ---\nCommit: {message}\nPatch:\n{}",
                            file.filename,
                            truncate(patch, PATCH_LIMIT)
                        )),
                        None if file.filename.ends_with(".ipynb") => parts.push(format!(
                            "--- REPO: {repo} | FILE: {} ---\nJupyter Notebook updated in commit: {message}",
                            file.filename
                        )),
                        None => {}
                    }
                }
            }
        }

        debug!(%username, events_analyzed, patches = parts.len(), "github activity collected");
        if parts.is_empty() {
            return Ok(None);
        }
        Ok(Some(RecentActivity {
            code_context: parts.join("\n\n"),
            latest_commit_sha,
            touched_repos,
            events_analyzed,
        }))
    }
}

fn is_code_file(filename: &str) -> bool {
    CODE_EXTENSIONS.iter().any(|ext| filename.ends_with(ext))
}
