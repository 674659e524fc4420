//! Per-user cache in front of PostgreSQL.
//!
//! Every operation fails soft: a backend error is logged and reported as a miss
//! (reads) or ignored (writes), so callers behave exactly as if no cache existed.

pub mod redis_backend;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

pub use redis_backend::RedisCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// The per-user aggregates that are cached, each with its own TTL policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Profile,
    DailySnapshot,
    Activity,
    PracticeProgress,
}

impl CacheKind {
    pub const ALL: [CacheKind; 4] = [
        CacheKind::Profile,
        CacheKind::DailySnapshot,
        CacheKind::Activity,
        CacheKind::PracticeProgress,
    ];

    pub fn prefix(&self) -> &'static str {
        match self {
            CacheKind::Profile => "profile",
            CacheKind::DailySnapshot => "today_data",
            CacheKind::Activity => "activity",
            CacheKind::PracticeProgress => "practice_progress",
        }
    }

    /// `None` means the entry never expires and is only invalidated explicitly.
    pub fn ttl(&self) -> Option<Duration> {
        match self {
            CacheKind::Profile => Some(Duration::from_secs(60 * 60)),
            CacheKind::DailySnapshot | CacheKind::Activity => {
                Some(Duration::from_secs(24 * 60 * 60))
            }
            CacheKind::PracticeProgress => None,
        }
    }

    pub fn key(&self, user_id: Uuid) -> String {
        format!("{}:{}", self.prefix(), user_id)
    }
}

/// Raw string key/value store. `RedisCache` in production.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
    async fn ping(&self) -> Result<(), CacheError>;
}

#[derive(Clone, Default)]
pub struct Cache {
    backend: Option<Arc<dyn CacheBackend>>,
}

impl Cache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// A cache that always misses.
    #[cfg(test)]
    pub fn disabled() -> Self {
        Self { backend: None }
    }

    pub async fn get<T: DeserializeOwned>(&self, kind: CacheKind, user_id: Uuid) -> Option<T> {
        let backend = self.backend.as_ref()?;
        let key = kind.key(user_id);
        match backend.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!(%key, "cache hit");
                    Some(value)
                }
                Err(e) => {
                    warn!(%key, "discarding undecodable cache entry: {e}");
                    None
                }
            },
            Ok(None) => {
                debug!(%key, "cache miss");
                None
            }
            Err(e) => {
                warn!(%key, "cache read failed, treating as miss: {e}");
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, kind: CacheKind, user_id: Uuid, value: &T) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        let key = kind.key(user_id);
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(%key, "cache payload not serializable: {e}");
                return;
            }
        };
        if let Err(e) = backend.set(&key, &raw, kind.ttl()).await {
            warn!(%key, "cache write failed: {e}");
        }
    }

    pub async fn invalidate(&self, kind: CacheKind, user_id: Uuid) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        let key = kind.key(user_id);
        if let Err(e) = backend.delete(&key).await {
            warn!(%key, "cache invalidation failed: {e}");
        }
    }

    pub async fn flush_user(&self, user_id: Uuid) {
        for kind in CacheKind::ALL {
            self.invalidate(kind, user_id).await;
        }
    }

    pub async fn is_healthy(&self) -> bool {
        match self.backend.as_ref() {
            Some(backend) => backend.ping().await.is_ok(),
            None => false,
        }
    }

    /// Cache first; on miss, load from the store and hydrate the cache.
    /// `Ok(None)` from the loader is not cached.
    pub async fn read_through<T, E, F, Fut>(
        &self,
        kind: CacheKind,
        user_id: Uuid,
        load: F,
    ) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        if let Some(hit) = self.get(kind, user_id).await {
            return Ok(Some(hit));
        }
        let loaded = load().await?;
        if let Some(value) = &loaded {
            self.set(kind, user_id, value).await;
        }
        Ok(loaded)
    }

    /// Store first, then cache. The cache is never written if the store write fails.
    pub async fn write_through<T, E, F, Fut>(
        &self,
        kind: CacheKind,
        user_id: Uuid,
        store: F,
    ) -> Result<T, E>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let stored = store().await?;
        self.set(kind, user_id, &stored).await;
        Ok(stored)
    }
}
