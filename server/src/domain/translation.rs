//! Translation service
//!
//! A translation is one value of one key in one language. The matrix view
//! groups them by key, then by language code.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;

use crate::data::cache::MatrixPage;
use crate::data::traits::{LanguageRepository, ProjectRepository, TranslationRepository};
use crate::data::types::{LanguageRow, NewTranslation, TranslationRow};
use crate::domain::error::DomainError;
use crate::domain::models::{
    BatchTranslationRequest, CreateTranslationRequest, KeyValues, MatrixCell, Page,
    PushKeysRequest, PushKeysResult, TranslationMatrix, UpdateTranslationRequest,
    UpsertSummary,
};

#[async_trait]
pub trait TranslationService: Send + Sync {
    async fn create(&self, req: CreateTranslationRequest) -> Result<TranslationRow, DomainError>;

    /// One key, values addressed by language code. Empty values and unknown
    /// codes are skipped.
    async fn create_batch(
        &self,
        req: BatchTranslationRequest,
    ) -> Result<Vec<TranslationRow>, DomainError>;

    /// Insert missing values and overwrite existing ones
    async fn upsert_batch(
        &self,
        project_id: u64,
        values: KeyValues,
    ) -> Result<UpsertSummary, DomainError>;

    async fn get_by_id(&self, id: u64) -> Result<TranslationRow, DomainError>;

    async fn list_by_project(
        &self,
        project_id: u64,
        limit: u32,
        offset: u32,
    ) -> Result<Page<TranslationRow>, DomainError>;

    async fn matrix(
        &self,
        project_id: u64,
        page: MatrixPage,
        keyword: Option<&str>,
    ) -> Result<TranslationMatrix, DomainError>;

    async fn update(
        &self,
        id: u64,
        req: UpdateTranslationRequest,
    ) -> Result<TranslationRow, DomainError>;

    /// Returns the removed row
    async fn delete(&self, id: u64) -> Result<TranslationRow, DomainError>;

    /// Returns the removed rows; unknown ids are ignored
    async fn delete_batch(&self, ids: &[u64]) -> Result<Vec<TranslationRow>, DomainError>;

    /// Whole project as key -> language code -> value
    async fn export(&self, project_id: u64) -> Result<KeyValues, DomainError>;

    /// Accepts `key -> {code: value}` or `code -> {key: value}`
    async fn import(
        &self,
        project_id: u64,
        data: serde_json::Value,
    ) -> Result<UpsertSummary, DomainError>;

    /// Create rows for keys the project does not have yet
    async fn push_keys(&self, req: PushKeysRequest) -> Result<PushKeysResult, DomainError>;
}

pub struct BaseTranslationService {
    translations: Arc<dyn TranslationRepository>,
    languages: Arc<dyn LanguageRepository>,
    projects: Arc<dyn ProjectRepository>,
}

impl BaseTranslationService {
    pub fn new(
        translations: Arc<dyn TranslationRepository>,
        languages: Arc<dyn LanguageRepository>,
        projects: Arc<dyn ProjectRepository>,
    ) -> Self {
        Self {
            translations,
            languages,
            projects,
        }
    }

    async fn require_project(&self, project_id: u64) -> Result<(), DomainError> {
        match self.projects.get_by_id(project_id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::not_found(format!("project {project_id}"))),
        }
    }

    async fn language_ids_by_code(&self) -> Result<HashMap<String, u64>, DomainError> {
        Ok(self
            .languages
            .get_all()
            .await?
            .into_iter()
            .map(|l| (l.code, l.id))
            .collect())
    }
}

/// Rewrite `code -> {key: value}` input into `key -> {code: value}`.
///
/// The input is read as language-first when every top-level key is a known
/// language code. Non-string values are dropped.
fn normalize_import(
    data: serde_json::Value,
    known_codes: &HashMap<String, u64>,
) -> Result<KeyValues, DomainError> {
    let serde_json::Value::Object(top) = data else {
        return Err(DomainError::invalid("import data must be a JSON object"));
    };

    let language_first = !top.is_empty() && top.keys().all(|k| known_codes.contains_key(k));

    let mut values = KeyValues::new();
    for (outer, inner) in top {
        let serde_json::Value::Object(inner) = inner else {
            continue;
        };
        for (inner_key, value) in inner {
            let serde_json::Value::String(value) = value else {
                continue;
            };
            let (key, code) = if language_first {
                (inner_key, outer.clone())
            } else {
                (outer.clone(), inner_key)
            };
            values.entry(key).or_default().insert(code, value);
        }
    }
    Ok(values)
}

fn default_language(languages: &[LanguageRow]) -> Option<&LanguageRow> {
    languages
        .iter()
        .find(|l| l.is_default)
        .or_else(|| languages.first())
}

#[async_trait]
impl TranslationService for BaseTranslationService {
    async fn create(&self, req: CreateTranslationRequest) -> Result<TranslationRow, DomainError> {
        self.require_project(req.project_id).await?;
        if self.languages.get_by_id(req.language_id).await?.is_none() {
            return Err(DomainError::not_found(format!(
                "language {}",
                req.language_id
            )));
        }

        Ok(self
            .translations
            .create(NewTranslation {
                project_id: req.project_id,
                key_name: req.key_name.trim().to_string(),
                context: req.context.trim().to_string(),
                language_id: req.language_id,
                value: req.value.trim().to_string(),
            })
            .await?)
    }

    async fn create_batch(
        &self,
        req: BatchTranslationRequest,
    ) -> Result<Vec<TranslationRow>, DomainError> {
        self.require_project(req.project_id).await?;
        let codes = self.language_ids_by_code().await?;

        let key_name = req.key_name.trim().to_string();
        let context = req.context.trim().to_string();
        let rows: Vec<NewTranslation> = req
            .translations
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .filter_map(|(code, value)| {
                codes.get(&code).map(|&language_id| NewTranslation {
                    project_id: req.project_id,
                    key_name: key_name.clone(),
                    context: context.clone(),
                    language_id,
                    value: value.trim().to_string(),
                })
            })
            .collect();

        if rows.is_empty() {
            return Err(DomainError::invalid("no valid translations to create"));
        }
        Ok(self.translations.create_batch(rows).await?)
    }

    async fn upsert_batch(
        &self,
        project_id: u64,
        values: KeyValues,
    ) -> Result<UpsertSummary, DomainError> {
        self.require_project(project_id).await?;
        let codes = self.language_ids_by_code().await?;

        let mut summary = UpsertSummary::default();
        let mut inserts = Vec::new();
        for (key, by_code) in values {
            for (code, value) in by_code {
                let Some(&language_id) = codes.get(&code) else {
                    summary.skipped += 1;
                    continue;
                };
                match self.translations.find(project_id, &key, language_id).await? {
                    Some(mut existing) => {
                        if existing.value != value {
                            existing.value = value;
                            self.translations.update(existing).await?;
                            summary.updated += 1;
                        }
                    }
                    None => inserts.push(NewTranslation {
                        project_id,
                        key_name: key.clone(),
                        context: String::new(),
                        language_id,
                        value,
                    }),
                }
            }
        }

        if !inserts.is_empty() {
            summary.created = self.translations.create_batch(inserts).await?.len() as u64;
        }
        Ok(summary)
    }

    async fn get_by_id(&self, id: u64) -> Result<TranslationRow, DomainError> {
        self.translations
            .get_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("translation {id}")))
    }

    async fn list_by_project(
        &self,
        project_id: u64,
        limit: u32,
        offset: u32,
    ) -> Result<Page<TranslationRow>, DomainError> {
        let (items, total) = self
            .translations
            .get_by_project(project_id, limit, offset)
            .await?;
        Ok(Page { items, total })
    }

    async fn matrix(
        &self,
        project_id: u64,
        page: MatrixPage,
        keyword: Option<&str>,
    ) -> Result<TranslationMatrix, DomainError> {
        let keys = self.translations.keys(project_id, keyword).await?;
        let total = keys.len() as u64;

        let window: Vec<String> = match page {
            MatrixPage::All => keys,
            MatrixPage::Window { limit, offset } => keys
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect(),
        };
        if window.is_empty() {
            return Ok(TranslationMatrix {
                entries: BTreeMap::new(),
                total,
            });
        }

        let codes: HashMap<u64, String> = self
            .languages
            .get_all()
            .await?
            .into_iter()
            .map(|l| (l.id, l.code))
            .collect();
        let rows = self.translations.get_by_keys(project_id, &window).await?;

        let mut entries: BTreeMap<String, BTreeMap<String, MatrixCell>> = window
            .into_iter()
            .map(|key| (key, BTreeMap::new()))
            .collect();
        for row in rows {
            // Rows of a deleted language stay in the table but leave the matrix
            let Some(code) = codes.get(&row.language_id) else {
                continue;
            };
            if let Some(cells) = entries.get_mut(&row.key_name) {
                cells.insert(
                    code.clone(),
                    MatrixCell {
                        id: row.id,
                        value: row.value,
                    },
                );
            }
        }

        Ok(TranslationMatrix { entries, total })
    }

    async fn update(
        &self,
        id: u64,
        req: UpdateTranslationRequest,
    ) -> Result<TranslationRow, DomainError> {
        let mut translation = self.get_by_id(id).await?;
        if let Some(value) = req.value {
            translation.value = value.trim().to_string();
        }
        if let Some(context) = req.context {
            translation.context = context.trim().to_string();
        }
        if let Some(status) = req.status {
            translation.status = status;
        }
        Ok(self.translations.update(translation).await?)
    }

    async fn delete(&self, id: u64) -> Result<TranslationRow, DomainError> {
        Ok(self.translations.delete(id).await?)
    }

    async fn delete_batch(&self, ids: &[u64]) -> Result<Vec<TranslationRow>, DomainError> {
        Ok(self.translations.delete_batch(ids).await?)
    }

    async fn export(&self, project_id: u64) -> Result<KeyValues, DomainError> {
        self.require_project(project_id).await?;
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
        let codes = self.language_ids_by_code().await?;
        let values = normalize_import(data, &codes)?;
        if values.is_empty() {
            return Err(DomainError::invalid(
                "no valid translations found in import data",
            ));
        }
        self.upsert_batch(project_id, values).await
    }

    async fn push_keys(&self, req: PushKeysRequest) -> Result<PushKeysResult, DomainError> {
        self.require_project(req.project_id).await?;

        let languages = self.languages.get_all().await?;
        let default_code = default_language(&languages)
            .map(|l| l.code.clone())
            .ok_or_else(|| DomainError::invalid("no languages available"))?;

        let mut existing: BTreeSet<String> = self
            .translations
            .keys(req.project_id, None)
            .await?
            .into_iter()
            .collect();

        let mut result = PushKeysResult::default();
        for key in req.keys {
            if existing.contains(&key) {
                result.existed.push(key);
                continue;
            }

            let rows = languages
                .iter()
                .map(|language| {
                    let value = match &req.translations {
                        Some(by_code) => by_code
                            .get(&language.code)
                            .and_then(|values| values.get(&key))
                            .cloned(),
                        None if language.code == default_code => req.defaults.get(&key).cloned(),
                        None => None,
                    };
                    NewTranslation {
                        project_id: req.project_id,
                        key_name: key.clone(),
                        context: String::new(),
                        language_id: language.id,
                        value: value.unwrap_or_default(),
                    }
                })
                .collect();

            match self.translations.create_batch(rows).await {
                Ok(_) => {
                    existing.insert(key.clone());
                    result.added.push(key);
                }
                Err(e) => {
                    tracing::warn!(project_id = req.project_id, key = %key, error = %e, "Failed to push key");
                    result.failed.push(key);
                }
            }
        }

        Ok(result)
    }
}
