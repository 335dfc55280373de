//! In-process repository implementation
//!
//! All tables live behind one `parking_lot::RwLock`, so multi-row writes
//! (batch insert, project delete with its translations) are atomic.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::data::error::DataError;
use crate::data::traits::{
    LanguageRepository, ProjectRepository, StatsRepository, TranslationRepository,
    UserRepository,
};
use crate::data::types::{
    LanguageRow, NewLanguage, NewProject, NewTranslation, NewUser, ProjectRow, STATUS_ACTIVE,
    StoreCounts, TranslationRow, UserRow,
};

struct Table<T> {
    rows: BTreeMap<u64, T>,
    next_id: u64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T: Clone> Table<T> {
    fn insert_with(&mut self, build: impl FnOnce(u64) -> T) -> T {
        let id = self.next_id;
        self.next_id += 1;
        let row = build(id);
        self.rows.insert(id, row.clone());
        row
    }

    fn get(&self, id: u64) -> Option<T> {
        self.rows.get(&id).cloned()
    }

    fn page(&self, filter: impl Fn(&T) -> bool, limit: u32, offset: u32) -> (Vec<T>, u64) {
        let matching: Vec<&T> = self.rows.values().filter(|row| filter(*row)).collect();
        let total = matching.len() as u64;
        let rows = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        (rows, total)
    }
}

#[derive(Default)]
struct Tables {
    projects: Table<ProjectRow>,
    languages: Table<LanguageRow>,
    translations: Table<TranslationRow>,
    users: Table<UserRow>,
}

impl Tables {
    fn translation_exists(&self, project_id: u64, key_name: &str, language_id: u64) -> bool {
        self.translations.rows.values().any(|t| {
            t.project_id == project_id && t.language_id == language_id && t.key_name == key_name
        })
    }
}

/// Case-insensitive substring match; `None` or blank matches everything
fn contains_keyword(keyword: Option<&str>, fields: &[&str]) -> bool {
    match keyword.map(str::trim).filter(|kw| !kw.is_empty()) {
        None => true,
        Some(kw) => {
            let kw = kw.to_lowercase();
            fields.iter().any(|f| f.to_lowercase().contains(&kw))
        }
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Thread-safe in-memory store
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn get_by_id(&self, id: u64) -> Result<Option<ProjectRow>, DataError> {
        Ok(self.tables.read().projects.get(id))
    }

    async fn get_all(
        &self,
        limit: u32,
        offset: u32,
        keyword: Option<&str>,
    ) -> Result<(Vec<ProjectRow>, u64), DataError> {
        let tables = self.tables.read();
        Ok(tables.projects.page(
            |p| contains_keyword(keyword, &[&p.name, &p.slug, &p.description]),
            limit,
            offset,
        ))
    }

    async fn create(&self, project: NewProject) -> Result<ProjectRow, DataError> {
        let mut tables = self.tables.write();
        if let Some(existing) = tables
            .projects
            .rows
            .values()
            .find(|p| p.slug == project.slug || p.name == project.name)
        {
            return Err(DataError::conflict(if existing.slug == project.slug {
                format!("project slug '{}' already exists", project.slug)
            } else {
                format!("project name '{}' already exists", project.name)
            }));
        }

        let ts = now();
        Ok(tables.projects.insert_with(|id| ProjectRow {
            id,
            name: project.name,
            slug: project.slug,
            description: project.description,
            status: project.status,
            created_at: ts,
            updated_at: ts,
        }))
    }

    async fn update(&self, mut project: ProjectRow) -> Result<ProjectRow, DataError> {
        let mut tables = self.tables.write();
        if !tables.projects.rows.contains_key(&project.id) {
            return Err(DataError::not_found("project", project.id));
        }
        if tables
            .projects
            .rows
            .values()
            .any(|p| p.id != project.id && (p.slug == project.slug || p.name == project.name))
        {
            return Err(DataError::conflict(format!(
                "project name '{}' or slug '{}' already exists",
                project.name, project.slug
            )));
        }

        project.updated_at = now();
        tables.projects.rows.insert(project.id, project.clone());
        Ok(project)
    }

    async fn delete(&self, id: u64) -> Result<(), DataError> {
        let mut tables = self.tables.write();
        if tables.projects.rows.remove(&id).is_none() {
            return Err(DataError::not_found("project", id));
        }
        tables.translations.rows.retain(|_, t| t.project_id != id);
        Ok(())
    }
}

#[async_trait]
impl LanguageRepository for MemoryStore {
    async fn get_by_id(&self, id: u64) -> Result<Option<LanguageRow>, DataError> {
        Ok(self.tables.read().languages.get(id))
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<LanguageRow>, DataError> {
        Ok(self
            .tables
            .read()
            .languages
            .rows
            .values()
            .find(|l| l.code == code)
            .cloned())
    }

    async fn get_all(&self) -> Result<Vec<LanguageRow>, DataError> {
        Ok(self.tables.read().languages.rows.values().cloned().collect())
    }

    async fn create(&self, language: NewLanguage) -> Result<LanguageRow, DataError> {
        let mut tables = self.tables.write();
        if tables
            .languages
            .rows
            .values()
            .any(|l| l.code == language.code)
        {
            return Err(DataError::conflict(format!(
                "language code '{}' already exists",
                language.code
            )));
        }

        let ts = now();
        Ok(tables.languages.insert_with(|id| LanguageRow {
            id,
            code: language.code,
            name: language.name,
            is_default: language.is_default,
            status: language.status,
            created_at: ts,
            updated_at: ts,
        }))
    }

    async fn update(&self, mut language: LanguageRow) -> Result<LanguageRow, DataError> {
        let mut tables = self.tables.write();
        if !tables.languages.rows.contains_key(&language.id) {
            return Err(DataError::not_found("language", language.id));
        }
        if tables
            .languages
            .rows
            .values()
            .any(|l| l.id != language.id && l.code == language.code)
        {
            return Err(DataError::conflict(format!(
                "language code '{}' already exists",
                language.code
            )));
        }

        language.updated_at = now();
        tables.languages.rows.insert(language.id, language.clone());
        Ok(language)
    }

    async fn delete(&self, id: u64) -> Result<(), DataError> {
        match self.tables.write().languages.rows.remove(&id) {
            Some(_) => Ok(()),
            None => Err(DataError::not_found("language", id)),
        }
    }

    async fn clear_default(&self, keep: Option<u64>) -> Result<(), DataError> {
        let mut tables = self.tables.write();
        let ts = now();
        for language in tables.languages.rows.values_mut() {
            if language.is_default && Some(language.id) != keep {
                language.is_default = false;
                language.updated_at = ts;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TranslationRepository for MemoryStore {
    async fn get_by_id(&self, id: u64) -> Result<Option<TranslationRow>, DataError> {
        Ok(self.tables.read().translations.get(id))
    }

    async fn get_by_project(
        &self,
        project_id: u64,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<TranslationRow>, u64), DataError> {
        let tables = self.tables.read();
        Ok(tables
            .translations
            .page(|t| t.project_id == project_id, limit, offset))
    }

    async fn find(
        &self,
        project_id: u64,
        key_name: &str,
        language_id: u64,
    ) -> Result<Option<TranslationRow>, DataError> {
        Ok(self
            .tables
            .read()
            .translations
            .rows
            .values()
            .find(|t| {
                t.project_id == project_id && t.language_id == language_id && t.key_name == key_name
            })
            .cloned())
    }

    async fn keys(
        &self,
        project_id: u64,
        keyword: Option<&str>,
    ) -> Result<Vec<String>, DataError> {
        let tables = self.tables.read();
        let keys: BTreeSet<&str> = tables
            .translations
            .rows
            .values()
            .filter(|t| t.project_id == project_id && t.status == STATUS_ACTIVE)
            .filter(|t| contains_keyword(keyword, &[&t.key_name, &t.value]))
            .map(|t| t.key_name.as_str())
            .collect();
        Ok(keys.into_iter().map(str::to_string).collect())
    }

    async fn get_by_keys(
        &self,
        project_id: u64,
        keys: &[String],
    ) -> Result<Vec<TranslationRow>, DataError> {
        let wanted: BTreeSet<&str> = keys.iter().map(String::as_str).collect();
        Ok(self
            .tables
            .read()
            .translations
            .rows
            .values()
            .filter(|t| {
                t.project_id == project_id
                    && t.status == STATUS_ACTIVE
                    && wanted.contains(t.key_name.as_str())
            })
            .cloned()
            .collect())
    }

    async fn create(&self, translation: NewTranslation) -> Result<TranslationRow, DataError> {
        let mut rows = TranslationRepository::create_batch(self, vec![translation]).await?;
        rows.pop()
            .ok_or_else(|| DataError::conflict("translation was not inserted"))
    }

    async fn create_batch(
        &self,
        translations: Vec<NewTranslation>,
    ) -> Result<Vec<TranslationRow>, DataError> {
        let mut tables = self.tables.write();

        let mut seen = BTreeSet::new();
        for t in &translations {
            if tables.translation_exists(t.project_id, &t.key_name, t.language_id)
                || !seen.insert((t.project_id, t.key_name.as_str(), t.language_id))
            {
                return Err(DataError::conflict(format!(
                    "translation '{}' already exists for language {}",
                    t.key_name, t.language_id
                )));
            }
        }

        let ts = now();
        Ok(translations
            .into_iter()
            .map(|t| {
                tables.translations.insert_with(|id| TranslationRow {
                    id,
                    project_id: t.project_id,
                    key_name: t.key_name,
                    context: t.context,
                    language_id: t.language_id,
                    value: t.value,
                    status: STATUS_ACTIVE.to_string(),
                    created_at: ts,
                    updated_at: ts,
                })
            })
            .collect())
    }

    async fn update(&self, mut translation: TranslationRow) -> Result<TranslationRow, DataError> {
        let mut tables = self.tables.write();
        if !tables.translations.rows.contains_key(&translation.id) {
            return Err(DataError::not_found("translation", translation.id));
        }
        translation.updated_at = now();
        tables
            .translations
            .rows
            .insert(translation.id, translation.clone());
        Ok(translation)
    }

    async fn delete(&self, id: u64) -> Result<TranslationRow, DataError> {
        self.tables
            .write()
            .translations
            .rows
            .remove(&id)
            .ok_or(DataError::not_found("translation", id))
    }

    async fn delete_batch(&self, ids: &[u64]) -> Result<Vec<TranslationRow>, DataError> {
        let mut tables = self.tables.write();
        Ok(ids
            .iter()
            .filter_map(|id| tables.translations.rows.remove(id))
            .collect())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get_by_id(&self, id: u64) -> Result<Option<UserRow>, DataError> {
        Ok(self.tables.read().users.get(id))
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<UserRow>, DataError> {
        Ok(self
            .tables
            .read()
            .users
            .rows
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get_all(
        &self,
        limit: u32,
        offset: u32,
        keyword: Option<&str>,
    ) -> Result<(Vec<UserRow>, u64), DataError> {
        let tables = self.tables.read();
        Ok(tables.users.page(
            |u| contains_keyword(keyword, &[&u.username, u.email.as_deref().unwrap_or("")]),
            limit,
            offset,
        ))
    }

    async fn create(&self, user: NewUser) -> Result<UserRow, DataError> {
        let mut tables = self.tables.write();
        if tables.users.rows.values().any(|u| u.username == user.username) {
            return Err(DataError::conflict(format!(
                "username '{}' already exists",
                user.username
            )));
        }

        let ts = now();
        Ok(tables.users.insert_with(|id| UserRow {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            status: STATUS_ACTIVE.to_string(),
            created_at: ts,
            updated_at: ts,
        }))
    }

    async fn update(&self, mut user: UserRow) -> Result<UserRow, DataError> {
        let mut tables = self.tables.write();
        if !tables.users.rows.contains_key(&user.id) {
            return Err(DataError::not_found("user", user.id));
        }
        user.updated_at = now();
        tables.users.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: u64) -> Result<(), DataError> {
        match self.tables.write().users.rows.remove(&id) {
            Some(_) => Ok(()),
            None => Err(DataError::not_found("user", id)),
        }
    }
}

#[async_trait]
impl StatsRepository for MemoryStore {
    async fn counts(&self) -> Result<StoreCounts, DataError> {
        let tables = self.tables.read();
        let keys: BTreeSet<(u64, &str)> = tables
            .translations
            .rows
            .values()
            .map(|t| (t.project_id, t.key_name.as_str()))
            .collect();
        Ok(StoreCounts {
            projects: tables.projects.rows.len() as u64,
            languages: tables.languages.rows.len() as u64,
            translations: tables.translations.rows.len() as u64,
            keys: keys.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_project(name: &str, slug: &str) -> NewProject {
        NewProject {
            name: name.to_string(),
            slug: slug.to_string(),
            description: String::new(),
            status: STATUS_ACTIVE.to_string(),
        }
    }

    fn new_translation(project_id: u64, key: &str, language_id: u64, value: &str) -> NewTranslation {
        NewTranslation {
            project_id,
            key_name: key.to_string(),
            context: String::new(),
            language_id,
            value: value.to_string(),
        }
    }

    #[tokio::test]
    async fn test_project_crud_and_uniqueness() {
        let store = MemoryStore::new();
        let web = ProjectRepository::create(&store, new_project("Web", "web"))
            .await
            .unwrap();
        assert_eq!(web.id, 1);

        let err = ProjectRepository::create(&store, new_project("Other", "web"))
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Conflict(_)));

        let mut renamed = web.clone();
        renamed.name = "Website".to_string();
        ProjectRepository::update(&store, renamed).await.unwrap();
        let loaded = ProjectRepository::get_by_id(&store, 1).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Website");

        ProjectRepository::delete(&store, 1).await.unwrap();
        assert!(ProjectRepository::get_by_id(&store, 1).await.unwrap().is_none());
        assert_eq!(
            ProjectRepository::delete(&store, 1).await.unwrap_err(),
            DataError::not_found("project", 1)
        );
    }

    #[tokio::test]
    async fn test_project_paging_and_keyword() {
        let store = MemoryStore::new();
        for (name, slug) in [("Shop", "shop"), ("Blog", "blog"), ("Shop Admin", "shop-admin")] {
            ProjectRepository::create(&store, new_project(name, slug))
                .await
                .unwrap();
        }

        let (page, total) = ProjectRepository::get_all(&store, 2, 0, None).await.unwrap();
        assert_eq!((page.len(), total), (2, 3));

        let (page, total) = ProjectRepository::get_all(&store, 10, 0, Some("SHOP"))
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(page[1].slug, "shop-admin");

        let (page, _) = ProjectRepository::get_all(&store, 10, 5, None).await.unwrap();
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn test_translation_batch_is_atomic() {
        let store = MemoryStore::new();
        TranslationRepository::create(&store, new_translation(1, "home.title", 1, "Home"))
            .await
            .unwrap();

        let err = TranslationRepository::create_batch(
            &store,
            vec![
                new_translation(1, "home.body", 1, "Body"),
                new_translation(1, "home.title", 1, "Dup"),
            ],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DataError::Conflict(_)));

        let keys = TranslationRepository::keys(&store, 1, None).await.unwrap();
        assert_eq!(keys, vec!["home.title".to_string()]);
    }

    #[tokio::test]
    async fn test_translation_keys_keyword_and_lookup() {
        let store = MemoryStore::new();
        TranslationRepository::create_batch(
            &store,
            vec![
                new_translation(1, "login.button", 1, "Sign in"),
                new_translation(1, "login.button", 2, "Anmelden"),
                new_translation(1, "home.title", 1, "Welcome"),
                new_translation(2, "login.button", 1, "Sign in"),
            ],
        )
        .await
        .unwrap();

        let keys = TranslationRepository::keys(&store, 1, None).await.unwrap();
        assert_eq!(keys, vec!["home.title", "login.button"]);

        let keys = TranslationRepository::keys(&store, 1, Some("anmelden"))
            .await
            .unwrap();
        assert_eq!(keys, vec!["login.button"]);

        let rows = TranslationRepository::get_by_keys(&store, 1, &keys).await.unwrap();
        assert_eq!(rows.len(), 2);

        let found = TranslationRepository::find(&store, 2, "login.button", 1)
            .await
            .unwrap();
        assert_eq!(found.map(|t| t.project_id), Some(2));
    }

    #[tokio::test]
    async fn test_project_delete_cascades_translations() {
        let store = MemoryStore::new();
        let project = ProjectRepository::create(&store, new_project("Web", "web"))
            .await
            .unwrap();
        TranslationRepository::create(&store, new_translation(project.id, "a", 1, "A"))
            .await
            .unwrap();

        ProjectRepository::delete(&store, project.id).await.unwrap();
        let counts = store.counts().await.unwrap();
        assert_eq!(counts, StoreCounts::default());
    }

    #[tokio::test]
    async fn test_delete_batch_skips_missing_ids() {
        let store = MemoryStore::new();
        let rows = TranslationRepository::create_batch(
            &store,
            vec![new_translation(1, "a", 1, "A"), new_translation(2, "b", 1, "B")],
        )
        .await
        .unwrap();

        let deleted = TranslationRepository::delete_batch(&store, &[rows[0].id, 99, rows[1].id])
            .await
            .unwrap();
        assert_eq!(deleted.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_default_keeps_one() {
        let store = MemoryStore::new();
        for (code, is_default) in [("en", true), ("de", false)] {
            LanguageRepository::create(
                &store,
                NewLanguage {
                    code: code.to_string(),
                    name: code.to_string(),
                    is_default,
                    status: STATUS_ACTIVE.to_string(),
                },
            )
            .await
            .unwrap();
        }

        let mut german = LanguageRepository::get_by_id(&store, 2).await.unwrap().unwrap();
        german.is_default = true;
        LanguageRepository::update(&store, german).await.unwrap();
        store.clear_default(Some(2)).await.unwrap();
        let defaults: Vec<u64> = LanguageRepository::get_all(&store)
            .await
            .unwrap()
            .into_iter()
            .filter(|l| l.is_default)
            .map(|l| l.id)
            .collect();
        assert_eq!(defaults, vec![2]);
    }

    #[tokio::test]
    async fn test_counts_distinct_keys() {
        let store = MemoryStore::new();
        TranslationRepository::create_batch(
            &store,
            vec![
                new_translation(1, "a", 1, "A"),
                new_translation(1, "a", 2, "A2"),
                new_translation(2, "a", 1, "A"),
            ],
        )
        .await
        .unwrap();

        let counts = store.counts().await.unwrap();
        assert_eq!((counts.translations, counts.keys), (3, 2));
    }
}
