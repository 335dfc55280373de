//! Service inputs and outputs
//!
//! Request structs derive `Validate` so the HTTP layer can reject them
//! before a service ever sees them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::data::types::{Role, UserRow};

/// Key name -> language code -> value
pub type KeyValues = BTreeMap<String, BTreeMap<String, String>>;

/// One page of results plus the total number of matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Validate slug: lowercase alphanumeric with single dashes
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let valid = !slug.is_empty()
        && slug.len() <= 64
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_slug").with_message(
            "Slug must be 1-64 lowercase letters, digits or single dashes".into(),
        ))
    }
}

/// Validate language code: `en`, `zh_CN`, `pt-BR`
pub fn validate_language_code(code: &str) -> Result<(), ValidationError> {
    let valid = (2..=16).contains(&code.len())
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_language_code")
            .with_message("Language code must be 2-16 letters, digits, '_' or '-'".into()))
    }
}

// ============================================================================
// Projects
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(custom(function = "validate_slug"))]
    pub slug: String,

    #[serde(default)]
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    pub status: Option<String>,
}

// ============================================================================
// Languages
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLanguageRequest {
    #[validate(custom(function = "validate_language_code"))]
    pub code: String,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateLanguageRequest {
    #[validate(custom(function = "validate_language_code"))]
    pub code: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    pub is_default: Option<bool>,

    pub status: Option<String>,
}

// ============================================================================
// Translations
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTranslationRequest {
    pub project_id: u64,

    #[validate(length(min = 1, max = 255, message = "Key must be 1-255 characters"))]
    pub key_name: String,

    #[serde(default)]
    pub context: String,

    pub language_id: u64,

    #[serde(default)]
    pub value: String,
}

/// One key with values for several languages, addressed by code
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BatchTranslationRequest {
    pub project_id: u64,

    #[validate(length(min = 1, max = 255, message = "Key must be 1-255 characters"))]
    pub key_name: String,

    #[serde(default)]
    pub context: String,

    /// Language code -> value
    pub translations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTranslationRequest {
    pub value: Option<String>,
    pub context: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DeleteBatchRequest {
    #[validate(length(min = 1, max = 1000, message = "ids must contain 1-1000 items"))]
    pub ids: Vec<u64>,
}

/// Cell of the translation matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixCell {
    pub id: u64,
    pub value: String,
}

/// Key -> language code -> cell, for one page of keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationMatrix {
    pub entries: BTreeMap<String, BTreeMap<String, MatrixCell>>,
    /// Number of keys matching the query before paging
    pub total: u64,
}

impl TranslationMatrix {
    /// Drop row ids, keeping only values
    pub fn values(&self) -> KeyValues {
        self.entries
            .iter()
            .map(|(key, cells)| {
                let values = cells
                    .iter()
                    .map(|(code, cell)| (code.clone(), cell.value.clone()))
                    .collect();
                (key.clone(), values)
            })
            .collect()
    }
}

/// Outcome of an upsert of many values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertSummary {
    pub created: u64,
    pub updated: u64,
    /// Values whose language code is unknown
    pub skipped: u64,
}

/// Keys pushed from the CLI
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PushKeysRequest {
    pub project_id: u64,

    #[validate(length(min = 1, max = 10000, message = "keys must contain 1-10000 items"))]
    pub keys: Vec<String>,

    /// Key -> value for the default language
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,

    /// Language code -> key -> value; takes precedence over `defaults`
    pub translations: Option<KeyValues>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushKeysResult {
    pub added: Vec<String>,
    pub existed: Vec<String>,
    pub failed: Vec<String>,
}

// ============================================================================
// Users
// ============================================================================

/// User profile, never carries the password digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            role: row.role,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be 3-50 characters"))]
    pub username: String,

    #[validate(length(min = 6, max = 128, message = "Password must be 6-128 characters"))]
    pub password: String,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[validate(length(min = 6, max = 128, message = "Password must be 6-128 characters"))]
    pub password: Option<String>,

    pub role: Option<Role>,

    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username cannot be empty"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

// ============================================================================
// Dashboard
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_projects: u64,
    pub total_languages: u64,
    pub total_translations: u64,
    pub total_keys: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("web-app").is_ok());
        assert!(validate_slug("v2").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Web").is_err());
        assert!(validate_slug("-web").is_err());
        assert!(validate_slug("web--app").is_err());
    }

    #[test]
    fn test_validate_language_code() {
        assert!(validate_language_code("en").is_ok());
        assert!(validate_language_code("zh_CN").is_ok());
        assert!(validate_language_code("pt-BR").is_ok());
        assert!(validate_language_code("e").is_err());
        assert!(validate_language_code("en us").is_err());
    }

    #[test]
    fn test_request_validation() {
        let req = CreateProjectRequest {
            name: String::new(),
            slug: "web".to_string(),
            description: String::new(),
        };
        assert!(req.validate().is_err());

        let req = UpdateProjectRequest {
            slug: Some("Bad Slug".to_string()),
            ..Default::default()
        };
        assert!(req.validate().is_err());
        assert!(UpdateProjectRequest::default().validate().is_ok());

        let req = CreateUserRequest {
            username: "alice".to_string(),
            password: "secret1".to_string(),
            email: Some("not-an-email".to_string()),
            role: Role::Member,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_matrix_values() {
        let mut matrix = TranslationMatrix::default();
        matrix.entries.entry("home.title".to_string()).or_default().insert(
            "en".to_string(),
            MatrixCell {
                id: 1,
                value: "Home".to_string(),
            },
        );
        let values = matrix.values();
        assert_eq!(values["home.title"]["en"], "Home");
    }
}
