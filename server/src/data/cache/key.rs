//! Cache key builders
//!
//! Keys are plain (unversioned). The entity store lives in process memory,
//! so entries a previous process left in a shared cache are purged at
//! startup through `CacheKey::owned_patterns`. Every query-shaped key ends
//! in fixed segments so a user keyword can never collide with pagination.

pub const TRANSLATION_PREFIX: &str = "translation";
pub const TRANSLATION_MATRIX_PREFIX: &str = "translation_matrix";
pub const DASHBOARD_STATS_KEY: &str = "dashboard:stats";
pub const LANGUAGES_KEY: &str = "languages";
pub const PROJECT_PREFIX: &str = "project";
pub const PROJECTS_KEY: &str = "projects";
pub const USER_PREFIX: &str = "user";

/// Page selector for translation matrix queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixPage {
    /// Every key of the project (export, CLI pull)
    All,
    Window { limit: u32, offset: u32 },
}

pub struct CacheKey;

impl CacheKey {
    /// `user:<id>`
    pub fn user(id: u64) -> String {
        format!("{USER_PREFIX}:{id}")
    }

    /// `project:<id>`
    pub fn project(id: u64) -> String {
        format!("{PROJECT_PREFIX}:{id}")
    }

    /// `projects[:search:<keyword>]:<limit>:<offset>`
    pub fn projects(limit: u32, offset: u32, keyword: Option<&str>) -> String {
        match non_empty(keyword) {
            Some(kw) => format!("{PROJECTS_KEY}:search:{kw}:{limit}:{offset}"),
            None => format!("{PROJECTS_KEY}:{limit}:{offset}"),
        }
    }

    pub fn languages() -> String {
        LANGUAGES_KEY.to_string()
    }

    /// `translation:<projectID>:<limit>:<offset>`
    pub fn translations(project_id: u64, limit: u32, offset: u32) -> String {
        format!("{TRANSLATION_PREFIX}:{project_id}:{limit}:{offset}")
    }

    /// `translation_matrix:<projectID>[:<keyword>]:<limit|all>:<offset>`
    pub fn translation_matrix(project_id: u64, page: MatrixPage, keyword: Option<&str>) -> String {
        let (limit, offset) = match page {
            MatrixPage::All => ("all".to_string(), 0),
            MatrixPage::Window { limit, offset } => (limit.to_string(), offset),
        };
        match non_empty(keyword) {
            Some(kw) => {
                format!("{TRANSLATION_MATRIX_PREFIX}:{project_id}:{kw}:{limit}:{offset}")
            }
            None => format!("{TRANSLATION_MATRIX_PREFIX}:{project_id}:{limit}:{offset}"),
        }
    }

    pub fn dashboard_stats() -> String {
        DASHBOARD_STATS_KEY.to_string()
    }

    /// Glob patterns covering every key built above
    pub fn owned_patterns() -> Vec<String> {
        vec![
            format!("{PROJECT_PREFIX}:*"),
            format!("{PROJECTS_KEY}:*"),
            LANGUAGES_KEY.to_string(),
            format!("{TRANSLATION_PREFIX}:*"),
            format!("{TRANSLATION_MATRIX_PREFIX}:*"),
            format!("{USER_PREFIX}:*"),
            DASHBOARD_STATS_KEY.to_string(),
        ]
    }
}

fn non_empty(keyword: Option<&str>) -> Option<&str> {
    keyword.map(str::trim).filter(|kw| !kw.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_keys() {
        assert_eq!(CacheKey::user(7), "user:7");
        assert_eq!(CacheKey::project(42), "project:42");
        assert_eq!(CacheKey::languages(), "languages");
        assert_eq!(CacheKey::dashboard_stats(), "dashboard:stats");
    }

    #[test]
    fn test_project_list_keys() {
        assert_eq!(CacheKey::projects(10, 0, None), "projects:10:0");
        assert_eq!(CacheKey::projects(10, 20, Some("  ")), "projects:10:20");
        assert_eq!(
            CacheKey::projects(10, 0, Some("shop")),
            "projects:search:shop:10:0"
        );
    }

    #[test]
    fn test_translation_keys() {
        assert_eq!(CacheKey::translations(3, 50, 100), "translation:3:50:100");
        assert_eq!(
            CacheKey::translation_matrix(3, MatrixPage::All, None),
            "translation_matrix:3:all:0"
        );
        assert_eq!(
            CacheKey::translation_matrix(3, MatrixPage::Window { limit: 10, offset: 0 }, None),
            "translation_matrix:3:10:0"
        );
        assert_eq!(
            CacheKey::translation_matrix(
                3,
                MatrixPage::Window { limit: 10, offset: 0 },
                Some("login")
            ),
            "translation_matrix:3:login:10:0"
        );
    }

    #[test]
    fn test_owned_patterns_cover_every_key() {
        let keys = [
            CacheKey::user(7),
            CacheKey::project(42),
            CacheKey::projects(10, 0, Some("shop")),
            CacheKey::languages(),
            CacheKey::translations(3, 50, 100),
            CacheKey::translation_matrix(3, MatrixPage::All, Some("login")),
            CacheKey::dashboard_stats(),
        ];
        let patterns = CacheKey::owned_patterns();
        for key in &keys {
            assert!(
                patterns.iter().any(|p| super::super::memory::glob_match(p, key)),
                "{key}"
            );
        }
    }

    #[test]
    fn test_keyword_cannot_impersonate_pagination() {
        let plain = CacheKey::translation_matrix(
            5,
            MatrixPage::Window { limit: 10, offset: 0 },
            None,
        );
        let keyword = CacheKey::translation_matrix(5, MatrixPage::All, Some("10"));
        assert_ne!(plain, keyword);

        let searched = CacheKey::projects(1, 2, Some("3"));
        assert_ne!(searched, CacheKey::projects(3, 1, None));
    }
}
