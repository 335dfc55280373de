//! Cache store backend trait

use std::time::Duration;

use async_trait::async_trait;

use super::error::CacheError;

/// Key/value store with per-key TTL and pattern deletes.
///
/// Implemented by the in-memory (moka) and Redis backends. Values are opaque
/// bytes; an empty value is a legal payload and is used by the cache-aside
/// layer as the "confirmed absent" marker.
///
/// Single-key operations are atomic. Return values of `delete` and `exists`
/// may be stale under concurrent writers, which is fine for a cache.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a value from the cache
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Set a value with an optional TTL
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>)
    -> Result<(), CacheError>;

    /// Delete a key. Returns `true` if the key existed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Remaining TTL for a key, `None` if missing or without expiry
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError>;

    /// Delete keys matching a glob pattern (`*` wildcard), returns the count.
    ///
    /// O(n) for the memory backend, SCAN based for Redis.
    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError>;

    /// Health check (validates connection)
    async fn health_check(&self) -> Result<(), CacheError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}
