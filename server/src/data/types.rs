//! Row types shared by the repository traits and their implementations

use serde::{Deserialize, Serialize};

pub const STATUS_ACTIVE: &str = "active";

// ============================================================================
// Project types
// ============================================================================

/// Project row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRow {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub status: String,
}

// ============================================================================
// Language types
// ============================================================================

/// Language row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageRow {
    pub id: u64,
    pub code: String,
    pub name: String,
    pub is_default: bool,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewLanguage {
    pub code: String,
    pub name: String,
    pub is_default: bool,
    pub status: String,
}

// ============================================================================
// Translation types
// ============================================================================

/// One value of one key in one language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRow {
    pub id: u64,
    pub project_id: u64,
    pub key_name: String,
    pub context: String,
    pub language_id: u64,
    pub value: String,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewTranslation {
    pub project_id: u64,
    pub key_name: String,
    pub context: String,
    pub language_id: u64,
    pub value: String,
}

// ============================================================================
// User types
// ============================================================================

/// Account role. Admins manage users and languages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Member,
}

impl Role {
    pub fn is_admin(self) -> bool {
        self == Self::Admin
    }
}

/// User row, including the stored password hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: u64,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

// ============================================================================
// Stats
// ============================================================================

/// Row counts across all tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub projects: u64,
    pub languages: u64,
    pub translations: u64,
    /// Distinct (project, key) pairs
    pub keys: u64,
}
