use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tokio::sync::Mutex;

use super::{CacheBackend, CacheError};

/// Redis-backed cache. The multiplexed connection is opened lazily and dropped
/// on error so the next call reconnects.
pub struct RedisCache {
    client: redis::Client,
    conn: Mutex<Option<MultiplexedConnection>>,
}

impl RedisCache {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            conn: Mutex::new(None),
        }
    }

    pub(crate) async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(backend_err)?;
        *guard = Some(conn.clone());
        Ok(conn)
    }

    pub(crate) async fn reset(&self) {
        *self.conn.lock().await = None;
    }

    pub(crate) async fn run<T, F>(&self, build: F) -> Result<T, CacheError>
    where
        T: redis::FromRedisValue,
        F: FnOnce() -> redis::Cmd,
    {
        let mut conn = self.connection().await?;
        match build().query_async::<_, T>(&mut conn).await {
            Ok(value) => Ok(value),
            Err(e) => {
                self.reset().await;
                Err(backend_err(e))
            }
        }
    }
}

fn backend_err(e: redis::RedisError) -> CacheError {
    CacheError::Backend(e.to_string())
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.run(|| {
            let mut cmd = redis::cmd("GET");
            cmd.arg(key);
            cmd
        })
        .await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.run(|| {
            let mut cmd = redis::cmd("SET");
            cmd.arg(key).arg(value);
            if let Some(ttl) = ttl {
                cmd.arg("EX").arg(ttl.as_secs().max(1));
            }
            cmd
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.run(|| {
            let mut cmd = redis::cmd("DEL");
            cmd.arg(key);
            cmd
        })
        .await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let _: String = self.run(|| redis::cmd("PING")).await?;
        Ok(())
    }
}
