//! Redis-backed key-value store.

use crate::cache::store::KeyValueStore;
use crate::error::{DataError, DataResult};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::debug;

/// Shared Redis client. Clones share one multiplexed, auto-reconnecting connection.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Connect to the Redis server at `url` (`redis://host:6379/0`).
    pub async fn connect(url: &str) -> DataResult<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            DataError::connection(
                format!("Invalid cache URL: {}", e),
                "Check the cache URL format: redis://host:6379/0",
            )
        })?;
        let manager = ConnectionManager::new(client).await.map_err(|e| {
            DataError::connection(
                format!("Failed to connect to cache: {}", e),
                "Check that the Redis server is running and accessible",
            )
        })?;
        Ok(Self { manager })
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> DataResult<Option<Vec<u8>>> {
        let mut conn = self.manager.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        debug!(key = %key, hit = value.is_some(), "Cache get");
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> DataResult<()> {
        let mut conn = self.manager.clone();
        if ttl.is_zero() {
            conn.set::<_, _, ()>(key, value).await?;
        } else {
            let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
            conn.pset_ex::<_, _, ()>(key, value, millis).await?;
        }
        debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "Cache set");
        Ok(())
    }

    async fn del(&self, key: &str) -> DataResult<()> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(key).await?;
        debug!(key = %key, "Cache del");
        Ok(())
    }

    async fn ping(&self) -> DataResult<()> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
