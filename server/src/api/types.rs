//! Shared API types
//!
//! Every response uses one envelope. Success:
//! `{"success": true, "data": ..., "meta"?: ...}`. Failure:
//! `{"success": false, "error": {"code", "message", "details"?}}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::core::constants::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::domain::DomainError;

/// Validator function for limit parameter
pub fn validate_limit(limit: u32) -> Result<(), ValidationError> {
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(ValidationError::new("limit_range")
            .with_message(format!("Limit must be between 1 and {}", MAX_PAGE_LIMIT).into()));
    }
    Ok(())
}

pub fn default_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

/// `?limit=&offset=&keyword=` for list endpoints
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    #[validate(custom(function = "validate_limit"))]
    pub limit: u32,

    #[serde(default)]
    pub offset: u32,

    #[validate(length(max = 100, message = "Keyword must be at most 100 characters"))]
    pub keyword: Option<String>,
}

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound { code: String, message: String },
    Unauthorized { code: String, message: String },
    Forbidden { code: String, message: String },
    Conflict { code: String, message: String },
    TooManyRequests { code: String, message: String, details: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn unauthorized(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn forbidden(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Forbidden {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            code: code.into(),
            message: message.into(),
        }
    }

    /// 429 with the client key in `details`
    pub fn too_many_requests(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self::TooManyRequests {
            code: code.into(),
            message: message.into(),
            details: details.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound(_) => Self::not_found("NOT_FOUND", e.to_string()),
            DomainError::AlreadyExists(_) => Self::conflict("ALREADY_EXISTS", e.to_string()),
            DomainError::InvalidInput(_) => Self::bad_request("INVALID_INPUT", e.to_string()),
            DomainError::InvalidCredentials => {
                Self::unauthorized("INVALID_CREDENTIALS", e.to_string())
            }
            DomainError::Internal(ref detail) => {
                tracing::error!(error = %detail, "Domain error");
                Self::internal("Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            Self::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message, None),
            Self::NotFound { code, message } => (StatusCode::NOT_FOUND, code, message, None),
            Self::Unauthorized { code, message } => {
                (StatusCode::UNAUTHORIZED, code, message, None)
            }
            Self::Forbidden { code, message } => (StatusCode::FORBIDDEN, code, message, None),
            Self::Conflict { code, message } => (StatusCode::CONFLICT, code, message, None),
            Self::TooManyRequests {
                code,
                message,
                details,
            } => (StatusCode::TOO_MANY_REQUESTS, code, message, Some(details)),
            Self::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL".to_string(),
                message,
                None,
            ),
        };
        (status, Json(error_body(&code, &message, details.as_deref()))).into_response()
    }
}

/// JSON body of a failed response
pub fn error_body(code: &str, message: &str, details: Option<&str>) -> serde_json::Value {
    let mut error = serde_json::json!({
        "code": code,
        "message": message,
    });
    if let Some(details) = details {
        error["details"] = serde_json::Value::String(details.to_string());
    }
    serde_json::json!({
        "success": false,
        "error": error,
    })
}

/// Pagination metadata in response
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PaginationMeta {
    pub limit: u32,
    pub offset: u32,
    pub total: u64,
}

/// Successful response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PaginationMeta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            meta: None,
        })
    }

    pub fn paginated(data: T, limit: u32, offset: u32, total: u64) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            meta: Some(PaginationMeta {
                limit,
                offset,
                total,
            }),
        })
    }
}

/// 201 with the success envelope
pub fn created<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, ApiResponse::ok(data)).into_response()
}
