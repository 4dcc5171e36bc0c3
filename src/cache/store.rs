//! Key-value client abstraction.

use crate::error::DataResult;
use async_trait::async_trait;
use std::time::Duration;

/// Raw byte store shared by every `Cache` of a process.
///
/// Implementations must be safe for concurrent use; entries are independently
/// keyed, so callers never lock across operations.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> DataResult<Option<Vec<u8>>>;

    /// Store `value` under `key`. A zero `ttl` stores without expiry.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> DataResult<()>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn del(&self, key: &str) -> DataResult<()>;

    /// Round trip to check the store is reachable.
    async fn ping(&self) -> DataResult<()>;
}
