//! Caching decorators for the domain services
//!
//! Each decorator implements the same trait as the service it wraps. Reads
//! go through `CacheAsideService`; writes call the inner service first and
//! invalidate only after it succeeded.

mod dashboard;
mod language;
mod project;
mod translation;
mod user;


use std::sync::Arc;

use crate::core::config::CacheTtlConfig;
use crate::data::cache::{CacheAsideService, InvalidationCoordinator, TtlPolicy};
use crate::domain::error::DomainError;

pub use dashboard::CachedDashboardService;
pub use language::CachedLanguageService;
pub use project::CachedProjectService;
pub use translation::CachedTranslationService;
pub use user::CachedUserService;

/// What every decorator needs: the read path, the invalidation path and TTLs
#[derive(Clone)]
pub struct CacheContext {
    pub aside: Arc<CacheAsideService>,
    pub invalidation: Arc<InvalidationCoordinator>,
    pub ttl: CacheTtlConfig,
}

impl CacheContext {
    pub fn new(
        aside: Arc<CacheAsideService>,
        invalidation: Arc<InvalidationCoordinator>,
        ttl: CacheTtlConfig,
    ) -> Self {
        Self {
            aside,
            invalidation,
            ttl,
        }
    }

    /// Entity and list reads
    pub fn default_policy(&self) -> TtlPolicy {
        TtlPolicy {
            positive: self.ttl.default_ttl,
            negative: self.ttl.negative_ttl,
        }
    }

    /// Keyword searches
    pub fn search_policy(&self) -> TtlPolicy {
        TtlPolicy {
            positive: self.ttl.search_ttl,
            negative: self.ttl.negative_ttl,
        }
    }

    /// Expensive aggregates
    pub fn long_policy(&self) -> TtlPolicy {
        TtlPolicy {
            positive: self.ttl.long_ttl,
            negative: self.ttl.negative_ttl,
        }
    }

    /// Search policy when a keyword is present, default otherwise
    pub fn query_policy(&self, keyword: Option<&str>) -> TtlPolicy {
        match keyword.map(str::trim) {
            Some(kw) if !kw.is_empty() => self.search_policy(),
            _ => self.default_policy(),
        }
    }
}

/// Turn a not-found error into `None` so it can be negatively cached
pub(crate) fn found<T>(result: Result<T, DomainError>) -> Result<Option<T>, DomainError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(DomainError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
