//! Typed cache over a shared key-value store.
//!
//! This module provides:
//! - The `KeyValueStore` client abstraction
//! - A Redis-backed store for shared, multi-instance deployments
//! - An in-process store with TTL expiry
//! - `Cache<T>`, a typed, namespaced view used for cache-aside reads

pub mod memory;
pub mod remote;
pub mod store;
pub mod typed;

pub use memory::MemoryStore;
pub use remote::RedisStore;
pub use store::KeyValueStore;
pub use typed::{Cache, CacheAside};
