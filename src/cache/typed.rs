//! Typed, namespaced cache entries.

use crate::cache::store::KeyValueStore;
use crate::error::{DataError, DataResult};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A cache entry holding either a collection of `T` or a single `T`.
///
/// The physical key is `"<app_name>::<name>"`, so applications sharing one
/// cache cluster never collide. Values are stored as JSON.
pub struct Cache<T> {
    store: Option<Arc<dyn KeyValueStore>>,
    name: String,
    key: String,
    ttl: Duration,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Cache<T> {
    pub(crate) fn new(
        store: Option<Arc<dyn KeyValueStore>>,
        app_name: &str,
        name: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        let name = name.into();
        Self {
            store,
            key: format!("{}::{}", app_name, name),
            name,
            ttl,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical key in the backing store.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn store(&self) -> DataResult<&Arc<dyn KeyValueStore>> {
        let store = self.store.as_ref().ok_or(DataError::CacheNotInitialized)?;
        if self.name.trim().is_empty() {
            return Err(DataError::EmptyCacheName);
        }
        Ok(store)
    }

    /// Remove the entry. Removing an absent entry succeeds.
    pub async fn del(&self) -> DataResult<()> {
        self.store()?.del(&self.key).await
    }

    async fn load(&self) -> DataResult<Vec<u8>> {
        self.store()?
            .get(&self.key)
            .await?
            .ok_or_else(|| DataError::cache_miss(&self.key))
    }

    async fn save(&self, encoded: serde_json::Result<Vec<u8>>) -> DataResult<()> {
        let store = self.store()?;
        match encoded {
            Ok(bytes) => store.set(&self.key, bytes, self.ttl).await,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Skipping cache write, value did not encode");
                Ok(())
            }
        }
    }
}

impl<T> Cache<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Read the cached collection. A missing entry is [`DataError::CacheMiss`].
    pub async fn many(&self) -> DataResult<Vec<T>> {
        let bytes = self.load().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Read the cached single record. A missing entry is [`DataError::CacheMiss`].
    pub async fn one(&self) -> DataResult<T> {
        let bytes = self.load().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Store a collection with the configured TTL.
    pub async fn set_many(&self, values: &[T]) -> DataResult<()> {
        self.save(serde_json::to_vec(values)).await
    }

    /// Store a single record with the configured TTL.
    pub async fn set_one(&self, value: &T) -> DataResult<()> {
        self.save(serde_json::to_vec(value)).await
    }
}

impl<T> Clone for Cache<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            name: self.name.clone(),
            key: self.key.clone(),
            ttl: self.ttl,
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Cache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("key", &self.key)
            .field("ttl", &self.ttl)
            .field("has_store", &self.store.is_some())
            .finish()
    }
}

/// Read-through/write-back seam used by queries to consult a cache.
///
/// Object safe, so a query can hold any cache without extra type bounds on
/// its record type.
#[async_trait]
pub trait CacheAside<T>: Send + Sync {
    fn key(&self) -> &str;

    async fn load_many(&self) -> DataResult<Vec<T>>;

    async fn load_one(&self) -> DataResult<T>;

    async fn store_many(&self, values: &[T]) -> DataResult<()>;

    async fn store_one(&self, value: &T) -> DataResult<()>;
}

#[async_trait]
impl<T> CacheAside<T> for Cache<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn key(&self) -> &str {
        &self.key
    }

    async fn load_many(&self) -> DataResult<Vec<T>> {
        let values = self.many().await?;
        debug!(key = %self.key, count = values.len(), "Cache hit");
        Ok(values)
    }

    async fn load_one(&self) -> DataResult<T> {
        let value = self.one().await?;
        debug!(key = %self.key, "Cache hit");
        Ok(value)
    }

    async fn store_many(&self, values: &[T]) -> DataResult<()> {
        self.set_many(values).await
    }

    async fn store_one(&self, value: &T) -> DataResult<()> {
        self.set_one(value).await
    }
}
