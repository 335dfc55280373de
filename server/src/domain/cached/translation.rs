use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use super::CacheContext;
use crate::data::cache::{CacheKey, EntityKind, MatrixPage, Mutation};
use crate::data::types::TranslationRow;
use crate::domain::error::DomainError;
use crate::domain::models::{
    BatchTranslationRequest, CreateTranslationRequest, KeyValues, Page, PushKeysRequest,
    PushKeysResult, TranslationMatrix, UpdateTranslationRequest, UpsertSummary,
};
use crate::domain::project::ProjectService;
use crate::domain::translation::TranslationService;

/// Caches per-project translation lists and matrices.
///
/// Invalidation is keyed by project id, so update and delete rely on the
/// inner service returning the affected rows.
pub struct CachedTranslationService {
    inner: Arc<dyn TranslationService>,
    projects: Arc<dyn ProjectService>,
    ctx: CacheContext,
}

impl CachedTranslationService {
    pub fn new(
        inner: Arc<dyn TranslationService>,
        projects: Arc<dyn ProjectService>,
        ctx: CacheContext,
    ) -> Self {
        Self {
            inner,
            projects,
            ctx,
        }
    }

    async fn invalidate_project(&self, mutation: Mutation, project_id: u64) {
        self.ctx
            .invalidation
            .invalidate(EntityKind::Translation, mutation, project_id)
            .await;
    }
}

#[async_trait]
impl TranslationService for CachedTranslationService {
    async fn create(&self, req: CreateTranslationRequest) -> Result<TranslationRow, DomainError> {
        let translation = self.inner.create(req).await?;
        self.invalidate_project(Mutation::Create, translation.project_id)
            .await;
        Ok(translation)
    }

    async fn create_batch(
        &self,
        req: BatchTranslationRequest,
    ) -> Result<Vec<TranslationRow>, DomainError> {
        let project_id = req.project_id;
        let rows = self.inner.create_batch(req).await?;
        self.invalidate_project(Mutation::Batch, project_id).await;
        Ok(rows)
    }

    async fn upsert_batch(
        &self,
        project_id: u64,
        values: KeyValues,
    ) -> Result<UpsertSummary, DomainError> {
        let summary = self.inner.upsert_batch(project_id, values).await?;
        self.invalidate_project(Mutation::Batch, project_id).await;
        Ok(summary)
    }

    async fn get_by_id(&self, id: u64) -> Result<TranslationRow, DomainError> {
        self.inner.get_by_id(id).await
    }

    async fn list_by_project(
        &self,
        project_id: u64,
        limit: u32,
        offset: u32,
    ) -> Result<Page<TranslationRow>, DomainError> {
        let key = CacheKey::translations(project_id, limit, offset);
        let page = self
            .ctx
            .aside
            .get_or_load(&key, self.ctx.default_policy(), move || async move {
                self.inner
                    .list_by_project(project_id, limit, offset)
                    .await
                    .map(Some)
            })
            .await?;
        Ok(page.unwrap_or(Page {
            items: Vec::new(),
            total: 0,
        }))
    }

    async fn matrix(
        &self,
        project_id: u64,
        page: MatrixPage,
        keyword: Option<&str>,
    ) -> Result<TranslationMatrix, DomainError> {
        let key = CacheKey::translation_matrix(project_id, page, keyword);
        let matrix = self
            .ctx
            .aside
            .get_or_load(&key, self.ctx.query_policy(keyword), move || async move {
                self.inner.matrix(project_id, page, keyword).await.map(Some)
            })
            .await?;
        Ok(matrix.unwrap_or_default())
    }

    async fn update(
        &self,
        id: u64,
        req: UpdateTranslationRequest,
    ) -> Result<TranslationRow, DomainError> {
        let translation = self.inner.update(id, req).await?;
        self.invalidate_project(Mutation::Update, translation.project_id)
            .await;
        Ok(translation)
    }

    async fn delete(&self, id: u64) -> Result<TranslationRow, DomainError> {
        let translation = self.inner.delete(id).await?;
        self.invalidate_project(Mutation::Delete, translation.project_id)
            .await;
        Ok(translation)
    }

    async fn delete_batch(&self, ids: &[u64]) -> Result<Vec<TranslationRow>, DomainError> {
        let rows = self.inner.delete_batch(ids).await?;
        let projects: BTreeSet<u64> = rows.iter().map(|t| t.project_id).collect();
        self.ctx
            .invalidation
            .invalidate_many(EntityKind::Translation, Mutation::Batch, projects)
            .await;
        Ok(rows)
    }

    async fn export(&self, project_id: u64) -> Result<KeyValues, DomainError> {
        self.projects.get_by_id(project_id).await?;
        Ok(self
            .matrix(project_id, MatrixPage::All, None)
            .await?
            .values())
    }

    async fn import(
        &self,
        project_id: u64,
        data: serde_json::Value,
    ) -> Result<UpsertSummary, DomainError> {
        let summary = self.inner.import(project_id, data).await?;
        self.invalidate_project(Mutation::Batch, project_id).await;
        Ok(summary)
    }

    async fn push_keys(&self, req: PushKeysRequest) -> Result<PushKeysResult, DomainError> {
        let project_id = req.project_id;
        let result = self.inner.push_keys(req).await?;
        if !result.added.is_empty() {
            self.invalidate_project(Mutation::Batch, project_id).await;
        }
        Ok(result)
    }
}
