//! Repository traits
//!
//! Each entity gets its own trait so services only see the rows they own.
//! `MemoryStore` implements all of them.

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::types::{
    LanguageRow, NewLanguage, NewProject, NewTranslation, NewUser, ProjectRow, StoreCounts,
    TranslationRow, UserRow,
};

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn get_by_id(&self, id: u64) -> Result<Option<ProjectRow>, DataError>;

    /// Page of projects ordered by id, plus the total matching `keyword`
    async fn get_all(
        &self,
        limit: u32,
        offset: u32,
        keyword: Option<&str>,
    ) -> Result<(Vec<ProjectRow>, u64), DataError>;

    async fn create(&self, project: NewProject) -> Result<ProjectRow, DataError>;

    async fn update(&self, project: ProjectRow) -> Result<ProjectRow, DataError>;

    /// Deletes the project and its translations
    async fn delete(&self, id: u64) -> Result<(), DataError>;
}

#[async_trait]
pub trait LanguageRepository: Send + Sync {
    async fn get_by_id(&self, id: u64) -> Result<Option<LanguageRow>, DataError>;

    async fn get_by_code(&self, code: &str) -> Result<Option<LanguageRow>, DataError>;

    async fn get_all(&self) -> Result<Vec<LanguageRow>, DataError>;

    async fn create(&self, language: NewLanguage) -> Result<LanguageRow, DataError>;

    async fn update(&self, language: LanguageRow) -> Result<LanguageRow, DataError>;

    async fn delete(&self, id: u64) -> Result<(), DataError>;

    /// Unset `is_default` on every language except `keep`
    async fn clear_default(&self, keep: Option<u64>) -> Result<(), DataError>;
}

#[async_trait]
pub trait TranslationRepository: Send + Sync {
    async fn get_by_id(&self, id: u64) -> Result<Option<TranslationRow>, DataError>;

    async fn get_by_project(
        &self,
        project_id: u64,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<TranslationRow>, u64), DataError>;

    async fn find(
        &self,
        project_id: u64,
        key_name: &str,
        language_id: u64,
    ) -> Result<Option<TranslationRow>, DataError>;

    /// Sorted distinct key names whose key or any value contains `keyword`
    async fn keys(&self, project_id: u64, keyword: Option<&str>)
    -> Result<Vec<String>, DataError>;

    async fn get_by_keys(
        &self,
        project_id: u64,
        keys: &[String],
    ) -> Result<Vec<TranslationRow>, DataError>;

    async fn create(&self, translation: NewTranslation) -> Result<TranslationRow, DataError>;

    /// All-or-nothing insert
    async fn create_batch(
        &self,
        translations: Vec<NewTranslation>,
    ) -> Result<Vec<TranslationRow>, DataError>;

    async fn update(&self, translation: TranslationRow) -> Result<TranslationRow, DataError>;

    async fn delete(&self, id: u64) -> Result<TranslationRow, DataError>;

    /// Returns the rows that existed and were removed
    async fn delete_batch(&self, ids: &[u64]) -> Result<Vec<TranslationRow>, DataError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_by_id(&self, id: u64) -> Result<Option<UserRow>, DataError>;

    async fn get_by_username(&self, username: &str) -> Result<Option<UserRow>, DataError>;

    async fn get_all(
        &self,
        limit: u32,
        offset: u32,
        keyword: Option<&str>,
    ) -> Result<(Vec<UserRow>, u64), DataError>;

    async fn create(&self, user: NewUser) -> Result<UserRow, DataError>;

    async fn update(&self, user: UserRow) -> Result<UserRow, DataError>;

    async fn delete(&self, id: u64) -> Result<(), DataError>;
}

#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn counts(&self) -> Result<StoreCounts, DataError>;
}
