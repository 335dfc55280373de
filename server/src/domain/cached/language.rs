use std::sync::Arc;

use async_trait::async_trait;

use super::CacheContext;
use crate::data::cache::{CacheKey, EntityKind, Mutation};
use crate::data::types::LanguageRow;
use crate::domain::error::DomainError;
use crate::domain::language::LanguageService;
use crate::domain::models::{CreateLanguageRequest, UpdateLanguageRequest};

/// Caches the full language list. Any language write also drops every
/// project's translation matrix, since matrix columns are languages.
pub struct CachedLanguageService {
    inner: Arc<dyn LanguageService>,
    ctx: CacheContext,
}

impl CachedLanguageService {
    pub fn new(inner: Arc<dyn LanguageService>, ctx: CacheContext) -> Self {
        Self { inner, ctx }
    }
}

#[async_trait]
impl LanguageService for CachedLanguageService {
    async fn create(&self, req: CreateLanguageRequest) -> Result<LanguageRow, DomainError> {
        let language = self.inner.create(req).await?;
        self.ctx
            .invalidation
            .invalidate(EntityKind::Language, Mutation::Create, language.id)
            .await;
        Ok(language)
    }

    async fn get_by_id(&self, id: u64) -> Result<LanguageRow, DomainError> {
        self.inner.get_by_id(id).await
    }

    async fn list(&self) -> Result<Vec<LanguageRow>, DomainError> {
        let languages = self
            .ctx
            .aside
            .get_or_load(
                &CacheKey::languages(),
                self.ctx.default_policy(),
                move || async move { self.inner.list().await.map(Some) },
            )
            .await?;
        Ok(languages.unwrap_or_default())
    }

    async fn update(
        &self,
        id: u64,
        req: UpdateLanguageRequest,
    ) -> Result<LanguageRow, DomainError> {
        let language = self.inner.update(id, req).await?;
        self.ctx
            .invalidation
            .invalidate(EntityKind::Language, Mutation::Update, id)
            .await;
        Ok(language)
    }

    async fn delete(&self, id: u64) -> Result<(), DomainError> {
        self.inner.delete(id).await?;
        self.ctx
            .invalidation
            .invalidate(EntityKind::Language, Mutation::Delete, id)
            .await;
        Ok(())
    }
}
