//! Domain error type

use thiserror::Error;

use crate::data::DataError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<DataError> for DomainError {
    fn from(e: DataError) -> Self {
        match e {
            DataError::NotFound { entity, id } => Self::NotFound(format!("{entity} {id}")),
            DataError::Conflict(message) => Self::AlreadyExists(message),
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidInput(format!("Invalid JSON: {e}"))
    }
}
