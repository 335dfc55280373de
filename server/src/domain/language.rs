//! Language service
//!
//! At most one language is the default. Setting `is_default` on one clears
//! it on every other. The default language cannot be deleted.

use std::sync::Arc;

use async_trait::async_trait;

use crate::data::traits::LanguageRepository;
use crate::data::types::{LanguageRow, NewLanguage, STATUS_ACTIVE};
use crate::domain::error::DomainError;
use crate::domain::models::{CreateLanguageRequest, UpdateLanguageRequest};

#[async_trait]
pub trait LanguageService: Send + Sync {
    async fn create(&self, req: CreateLanguageRequest) -> Result<LanguageRow, DomainError>;

    async fn get_by_id(&self, id: u64) -> Result<LanguageRow, DomainError>;

    async fn list(&self) -> Result<Vec<LanguageRow>, DomainError>;

    async fn update(&self, id: u64, req: UpdateLanguageRequest)
    -> Result<LanguageRow, DomainError>;

    async fn delete(&self, id: u64) -> Result<(), DomainError>;
}

pub struct BaseLanguageService {
    repo: Arc<dyn LanguageRepository>,
}

impl BaseLanguageService {
    pub fn new(repo: Arc<dyn LanguageRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl LanguageService for BaseLanguageService {
    async fn create(&self, req: CreateLanguageRequest) -> Result<LanguageRow, DomainError> {
        let language = self
            .repo
            .create(NewLanguage {
                code: req.code,
                name: req.name.trim().to_string(),
                is_default: req.is_default,
                status: STATUS_ACTIVE.to_string(),
            })
            .await?;
        if language.is_default {
            self.repo.clear_default(Some(language.id)).await?;
        }
        Ok(language)
    }

    async fn get_by_id(&self, id: u64) -> Result<LanguageRow, DomainError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("language {id}")))
    }

    async fn list(&self) -> Result<Vec<LanguageRow>, DomainError> {
        Ok(self.repo.get_all().await?)
    }

    async fn update(
        &self,
        id: u64,
        req: UpdateLanguageRequest,
    ) -> Result<LanguageRow, DomainError> {
        let mut language = self.get_by_id(id).await?;
        if let Some(code) = req.code {
            language.code = code;
        }
        if let Some(name) = req.name {
            language.name = name.trim().to_string();
        }
        if let Some(status) = req.status {
            language.status = status;
        }
        if let Some(is_default) = req.is_default {
            language.is_default = is_default;
        }

        let language = self.repo.update(language).await?;
        if language.is_default {
            self.repo.clear_default(Some(language.id)).await?;
        }
        Ok(language)
    }

    async fn delete(&self, id: u64) -> Result<(), DomainError> {
        let language = self.get_by_id(id).await?;
        if language.is_default {
            return Err(DomainError::invalid(format!(
                "cannot delete the default language '{}'",
                language.code
            )));
        }
        self.repo.delete(id).await?;
        tracing::debug!(language_id = id, code = %language.code, "Language deleted");
        Ok(())
    }
}
