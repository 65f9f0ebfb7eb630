//! Service error types with HTTP status code mapping.
//!
//! [`ServiceError`] is the central error type. Each variant maps to a
//! specific HTTP status code and structured JSON error response.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::SnippetId;

/// Field name to list of messages, e.g. `{"expires_at": ["..."]}`.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "validation failed",
///     "fields": { "title": ["This field may not be blank."] }
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see [`ServiceError`] code ranges).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Per-field validation messages, present on validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub fields: Option<FieldErrors>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request              |
/// | 2000–2999 | Not Found       | 404 Not Found                |
/// | 3000–3999 | Server          | 500 Internal Server Error    |
/// | 4000–4999 | Auth            | 401 Unauthorized / 403 Forbidden |
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Snippet does not exist or is not visible to the caller.
    #[error("snippet not found: {0}")]
    SnippetNotFound(SnippetId),

    /// Request body or query failed field validation.
    #[error("validation failed")]
    Validation(FieldErrors),

    /// Request could not be parsed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or invalid credentials.
    #[error("authentication required: {0}")]
    Unauthorized(String),

    /// Username/password pair did not match.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Caller is authenticated but not allowed to perform the action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Builds a [`ServiceError::Validation`] holding one message for one field.
    #[must_use]
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), vec![message.into()]);
        Self::Validation(fields)
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Validation(_) => 1001,
            Self::InvalidRequest(_) => 1002,
            Self::SnippetNotFound(_) => 2001,
            Self::PersistenceError(_) => 3001,
            Self::Internal(_) => 3000,
            Self::Unauthorized(_) => 4001,
            Self::InvalidCredentials => 4002,
            Self::Forbidden(_) => 4003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::SnippetNotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map_or_else(|| e.code.to_string(), ToString::to_string)
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        Self::Validation(fields)
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let message = self.to_string();
        let code = self.error_code();
        let fields = match self {
            Self::Validation(fields) => Some(fields),
            _ => None,
        };
        let body = ErrorResponse {
            error: ErrorBody {
                code,
                message,
                fields,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}
