//! Externalized interview session state.
//!
//! `InMemorySessionStore` only works for a single instance; multi-instance
//! deployments must use `RedisSessionStore`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use crate::cache::CacheBackend;
use crate::errors::AppError;
use crate::interview::session::InterviewSession;

pub const SESSION_TTL: Duration = Duration::from_secs(2 * 60 * 60);

pub fn session_key(id: Uuid) -> String {
    format!("interview_session:{id}")
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<InterviewSession>, AppError>;
    async fn put(&self, session: &InterviewSession) -> Result<(), AppError>;
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}

/// Sessions expire `ttl` after their last write, like the Redis keys. Expired
/// entries are dropped when read and swept on every write.
pub struct InMemorySessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<Uuid, (InterviewSession, Instant)>>,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(SESSION_TTL)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: Uuid) -> Result<Option<InterviewSession>, AppError> {
        let now = Instant::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(&id) {
                None => return Ok(None),
                Some((session, expires_at)) if *expires_at > now => return Ok(Some(session.clone())),
                Some(_) => {}
            }
        }
        self.sessions
            .write()
            .await
            .retain(|_, (_, expires_at)| *expires_at > now);
        Ok(None)
    }

    async fn put(&self, session: &InterviewSession) -> Result<(), AppError> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, (_, expires_at)| *expires_at > now);
        sessions.insert(session.id, (session.clone(), now + self.ttl));
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.sessions.write().await.remove(&id);
        Ok(())
    }
}

/// JSON sessions under `interview_session:{id}` with a sliding 2h TTL.
/// Unlike the cache, backend errors here are real failures.
pub struct RedisSessionStore {
    backend: Arc<dyn CacheBackend>,
}

impl RedisSessionStore {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }
}

fn upstream(e: impl std::fmt::Display) -> AppError {
    AppError::Upstream(format!("session store: {e}"))
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, id: Uuid) -> Result<Option<InterviewSession>, AppError> {
        let Some(raw) = self.backend.get(&session_key(id)).await.map_err(upstream)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("corrupt session {id}: {e}")))
    }

    async fn put(&self, session: &InterviewSession) -> Result<(), AppError> {
        let raw = serde_json::to_string(session)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("session encode: {e}")))?;
        self.backend
            .set(&session_key(session.id), &raw, Some(SESSION_TTL))
            .await
            .map_err(upstream)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.backend
            .delete(&session_key(id))
            .await
            .map_err(upstream)
    }
}
