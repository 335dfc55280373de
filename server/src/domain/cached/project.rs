use std::sync::Arc;

use async_trait::async_trait;

use super::{CacheContext, found};
use crate::data::cache::{CacheKey, EntityKind, Mutation};
use crate::data::types::ProjectRow;
use crate::domain::error::DomainError;
use crate::domain::models::{CreateProjectRequest, Page, UpdateProjectRequest};
use crate::domain::project::ProjectService;

pub struct CachedProjectService {
    inner: Arc<dyn ProjectService>,
    ctx: CacheContext,
}

impl CachedProjectService {
    pub fn new(inner: Arc<dyn ProjectService>, ctx: CacheContext) -> Self {
        Self { inner, ctx }
    }
}

#[async_trait]
impl ProjectService for CachedProjectService {
    async fn create(&self, req: CreateProjectRequest) -> Result<ProjectRow, DomainError> {
        let project = self.inner.create(req).await?;
        self.ctx
            .invalidation
            .invalidate(EntityKind::Project, Mutation::Create, project.id)
            .await;
        Ok(project)
    }

    async fn get_by_id(&self, id: u64) -> Result<ProjectRow, DomainError> {
        let key = CacheKey::project(id);
        self.ctx
            .aside
            .get_or_load(&key, self.ctx.default_policy(), move || async move {
                found(self.inner.get_by_id(id).await)
            })
            .await?
            .ok_or_else(|| DomainError::not_found(format!("project {id}")))
    }

    async fn list(
        &self,
        limit: u32,
        offset: u32,
        keyword: Option<&str>,
    ) -> Result<Page<ProjectRow>, DomainError> {
        let key = CacheKey::projects(limit, offset, keyword);
        let page = self
            .ctx
            .aside
            .get_or_load(&key, self.ctx.query_policy(keyword), move || async move {
                self.inner.list(limit, offset, keyword).await.map(Some)
            })
            .await?;
        Ok(page.unwrap_or(Page {
            items: Vec::new(),
            total: 0,
        }))
    }

    async fn update(&self, id: u64, req: UpdateProjectRequest) -> Result<ProjectRow, DomainError> {
        let project = self.inner.update(id, req).await?;
        self.ctx
            .invalidation
            .invalidate(EntityKind::Project, Mutation::Update, id)
            .await;
        Ok(project)
    }

    async fn delete(&self, id: u64) -> Result<(), DomainError> {
        self.inner.delete(id).await?;
        // Deleting a project also removes its translations
        self.ctx
            .invalidation
            .invalidate(EntityKind::Project, Mutation::Delete, id)
            .await;
        self.ctx
            .invalidation
            .invalidate(EntityKind::Translation, Mutation::Delete, id)
            .await;
        Ok(())
    }
}
