use std::sync::Arc;

use async_trait::async_trait;

use super::CacheContext;
use crate::data::cache::CacheKey;
use crate::domain::dashboard::DashboardService;
use crate::domain::error::DomainError;
use crate::domain::models::DashboardStats;

/// Stats use the long TTL; every project, language and translation write
/// clears them.
pub struct CachedDashboardService {
    inner: Arc<dyn DashboardService>,
    ctx: CacheContext,
}

impl CachedDashboardService {
    pub fn new(inner: Arc<dyn DashboardService>, ctx: CacheContext) -> Self {
        Self { inner, ctx }
    }
}

#[async_trait]
impl DashboardService for CachedDashboardService {
    async fn stats(&self) -> Result<DashboardStats, DomainError> {
        let stats = self
            .ctx
            .aside
            .get_or_load(
                &CacheKey::dashboard_stats(),
                self.ctx.long_policy(),
                move || async move { self.inner.stats().await.map(Some) },
            )
            .await?;
        Ok(stats.unwrap_or_default())
    }
}
