//! Error type for the persistence layer

use thiserror::Error;

/// Repository operation failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    /// No row with the given id
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    /// Unique constraint violated (slug, code, username, key per language)
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl DataError {
    pub fn not_found(entity: &'static str, id: u64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}
