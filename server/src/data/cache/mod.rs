//! Cache layer
//!
//! - `CacheService` is the key/value store (memory or Redis backend)
//! - `MutexRegistry` collapses concurrent misses for one key
//! - `CacheAsideService` is the read-through path with negative caching
//! - `InvalidationCoordinator` fans out deletes after mutations
//! - `RateLimiterRegistry` holds per-client token buckets

mod aside;
mod backend;
mod error;
mod invalidation;
mod key;
mod memory;
mod mutex;
pub mod rate_limiter;
mod redis;

use std::sync::Arc;
use std::time::Duration;

pub use aside::{CacheAsideService, TtlPolicy};
pub use backend::CacheBackend;
pub use error::CacheError;
pub use invalidation::{EntityKind, InvalidationCoordinator, KeyTarget, Mutation};
pub use key::{CacheKey, MatrixPage};
pub use mutex::{KeyGuard, MutexRegistry};
pub use rate_limiter::{RateLimitPolicy, RateLimiterRegistry};

use memory::InMemoryCache;

use crate::core::config::{CacheBackendType, CacheConfig};

/// Shared cache store
///
/// Thin wrapper over a `CacheBackend` that owns backend selection and
/// provides the logged, best-effort delete helpers used by invalidation.
pub struct CacheService {
    backend: Arc<dyn CacheBackend>,
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("backend", &self.backend.backend_name())
            .finish()
    }
}

impl CacheService {
    /// Create a cache service from configuration
    pub async fn new(config: &CacheConfig) -> Result<Self, CacheError> {
        let backend: Arc<dyn CacheBackend> = match config.backend {
            CacheBackendType::Memory => {
                tracing::debug!(max_entries = config.max_entries, "Initializing in-memory cache");
                Arc::new(InMemoryCache::new(config))
            }
            CacheBackendType::Redis => {
                let url = config.redis_url.as_ref().ok_or_else(|| {
                    CacheError::Config("redis_url required for Redis backend".into())
                })?;
                Arc::new(redis::RedisCache::new(url).await?)
            }
        };

        Ok(Self { backend })
    }

    /// Wrap an existing backend
    pub fn with_backend(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    pub async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.backend.get(key).await
    }

    pub async fn set_raw(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        self.backend.set(key, value, ttl).await
    }

    pub async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.backend.delete(key).await
    }

    /// Delete a key, logging instead of propagating failures.
    pub async fn invalidate_key(&self, key: &str) {
        if let Err(e) = self.backend.delete(key).await {
            tracing::warn!(key = %key, error = %e, "Cache invalidation failed");
        }
    }

    pub async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.backend.exists(key).await
    }

    /// Delete keys matching a glob pattern
    pub async fn invalidate(&self, pattern: &str) -> Result<u64, CacheError> {
        self.backend.delete_pattern(pattern).await
    }

    /// Pattern delete, logging instead of propagating failures.
    pub async fn invalidate_pattern(&self, pattern: &str) {
        match self.backend.delete_pattern(pattern).await {
            Ok(removed) => tracing::trace!(pattern, removed, "Cache pattern invalidated"),
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "Cache pattern invalidation failed")
            }
        }
    }

    /// Delete every key this service's callers write, returning the count
    pub async fn purge_owned_keys(&self) -> Result<u64, CacheError> {
        let mut removed = 0;
        for pattern in CacheKey::owned_patterns() {
            removed += self.backend.delete_pattern(&pattern).await?;
        }
        Ok(removed)
    }

    pub async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        self.backend.ttl(key).await
    }

    pub async fn health_check(&self) -> Result<(), CacheError> {
        self.backend.health_check().await
    }
}

/// Backend that fails every call, for exercising fail-open paths.
#[cfg(test)]
pub(crate) mod testing {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{CacheBackend, CacheError};

    pub struct FailingBackend;

    fn down() -> CacheError {
        CacheError::Connection("cache store offline".to_string())
    }

    #[async_trait]
    impl CacheBackend for FailingBackend {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Err(down())
        }

        async fn set(
            &self,
            _key: &str,
            _value: Vec<u8>,
            _ttl: Option<Duration>,
        ) -> Result<(), CacheError> {
            Err(down())
        }

        async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
            Err(down())
        }

        async fn exists(&self, _key: &str) -> Result<bool, CacheError> {
            Err(down())
        }

        async fn ttl(&self, _key: &str) -> Result<Option<Duration>, CacheError> {
            Err(down())
        }

        async fn delete_pattern(&self, _pattern: &str) -> Result<u64, CacheError> {
            Err(down())
        }

        async fn health_check(&self) -> Result<(), CacheError> {
            Err(down())
        }

        fn backend_name(&self) -> &'static str {
            "failing"
        }
    }
}
