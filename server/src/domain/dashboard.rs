//! Dashboard statistics

use std::sync::Arc;

use async_trait::async_trait;

use crate::data::traits::StatsRepository;
use crate::domain::error::DomainError;
use crate::domain::models::DashboardStats;

#[async_trait]
pub trait DashboardService: Send + Sync {
    async fn stats(&self) -> Result<DashboardStats, DomainError>;
}

pub struct BaseDashboardService {
    repo: Arc<dyn StatsRepository>,
}

impl BaseDashboardService {
    pub fn new(repo: Arc<dyn StatsRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl DashboardService for BaseDashboardService {
    async fn stats(&self) -> Result<DashboardStats, DomainError> {
        let counts = self.repo.counts().await?;
        Ok(DashboardStats {
            total_projects: counts.projects,
            total_languages: counts.languages,
            total_translations: counts.translations,
            total_keys: counts.keys,
        })
    }
}
