//! Error handling module for the LearnHub backend.
//!
//! Every failure a handler can produce is an [`AppError`]. Rendering it is the single place where
//! failures become HTTP responses, so all of them share the `{ success: false, message }` envelope.

use std::any::Any;

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes used in logs, kept stable so log queries survive message rewording.
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const INVALID_ID: &str = "INVALID_ID";
    pub const DUPLICATE_KEY: &str = "DUPLICATE_KEY";
    pub const INVALID_TOKEN: &str = "INVALID_TOKEN";
    pub const EXPIRED_TOKEN: &str = "EXPIRED_TOKEN";
    pub const CONFLICT: &str = "CONFLICT";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const EXTERNAL_ERROR: &str = "EXTERNAL_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
}

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// No credentials were presented
    #[error("{0}")]
    Unauthorized(String),
    /// Authenticated, but the role may not use this route
    #[error("{0}")]
    Forbidden(String),
    /// Resource not found, or the requester is not eligible to see it
    #[error("{0}")]
    NotFound(String),
    /// Validation error
    #[error("{0}")]
    Validation(String),
    /// An identifier that is not a well-formed id
    #[error("Resource not found. Invalid {field}")]
    InvalidId { field: String },
    /// Unique key violation in the store
    #[error("Duplicate {field} entered")]
    Duplicate { field: String },
    /// Access token failed verification
    #[error("Access token is invalid. Try again")]
    InvalidToken,
    /// Access token is past its expiry
    #[error("Access token is expired. Try again")]
    ExpiredToken,
    /// Optimistic concurrency conflict
    #[error("{0}")]
    Conflict(String),
    /// Database error
    #[error("{0}")]
    Database(String),
    /// Media host, payment processor, video host or mailer failure
    #[error("{0}")]
    External(String),
    /// Internal server error
    #[error("{0}")]
    Internal(String),
    /// Bad request
    #[error("{0}")]
    BadRequest(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_)
            | AppError::InvalidId { .. }
            | AppError::Duplicate { .. }
            | AppError::InvalidToken
            | AppError::ExpiredToken
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::External(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => codes::UNAUTHORIZED,
            AppError::Forbidden(_) => codes::FORBIDDEN,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::InvalidId { .. } => codes::INVALID_ID,
            AppError::Duplicate { .. } => codes::DUPLICATE_KEY,
            AppError::InvalidToken => codes::INVALID_TOKEN,
            AppError::ExpiredToken => codes::EXPIRED_TOKEN,
            AppError::Conflict(_) => codes::CONFLICT,
            AppError::Database(_) => codes::DATABASE_ERROR,
            AppError::External(_) => codes::EXTERNAL_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
            AppError::BadRequest(_) => codes::BAD_REQUEST,
        }
    }

    /// Client-facing message. Empty messages fall back to the generic one.
    pub fn message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            "Internal server error".to_string()
        } else {
            message
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let field = duplicate_field(db_err.message());
                tracing::debug!(field = %field, "Unique constraint violated");
                return AppError::Duplicate { field };
            }
        }
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::Internal(format!("JSON error: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
            _ => AppError::InvalidToken,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Extract the offending column from a SQLite message such as
/// `UNIQUE constraint failed: layouts.kind`.
fn duplicate_field(message: &str) -> String {
    message
        .rsplit(':')
        .next()
        .and_then(|cols| cols.split(',').next())
        .map(|col| col.trim())
        .map(|col| col.rsplit('.').next().unwrap_or(col).to_string())
        .filter(|col| !col.is_empty())
        .unwrap_or_else(|| "key".to_string())
}

/// Parse an identifier, rejecting anything that is not a UUID.
///
/// Returns the canonical (lower-case, hyphenated) form used as the storage key.
pub fn parse_id(raw: &str, field: &str) -> Result<String, AppError> {
    uuid::Uuid::parse_str(raw.trim())
        .map(|id| id.to_string())
        .map_err(|_| AppError::InvalidId {
            field: field.to_string(),
        })
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            success: false,
            message: error.message(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), "{}", self);
        } else {
            tracing::debug!(code = self.error_code(), status = status.as_u16(), "{}", self);
        }
        (status, Json(ErrorResponse::new(&self))).into_response()
    }
}

/// Panic handler for `CatchPanicLayer`: a panicking handler still answers with the envelope.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "Handler panicked");
    AppError::Internal("Internal server error".to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_failures_map_to_bad_request() {
        let invalid = AppError::InvalidId {
            field: "id".to_string(),
        };
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.message(), "Resource not found. Invalid id");

        let duplicate = AppError::Duplicate {
            field: "kind".to_string(),
        };
        assert_eq!(duplicate.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(duplicate.message(), "Duplicate kind entered");

        assert_eq!(AppError::InvalidToken.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::ExpiredToken.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::ExpiredToken.message(),
            "Access token is expired. Try again"
        );
    }

    #[test]
    fn test_empty_message_defaults_to_internal_server_error() {
        let err = AppError::Internal(String::new());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Internal server error");
    }

    #[test]
    fn test_duplicate_field_from_sqlite_message() {
        assert_eq!(
            duplicate_field("UNIQUE constraint failed: layouts.kind"),
            "kind"
        );
        assert_eq!(
            duplicate_field("UNIQUE constraint failed: user_courses.user_id, user_courses.course_id"),
            "user_id"
        );
        assert_eq!(duplicate_field(""), "key");
    }

    #[test]
    fn test_parse_id() {
        let id = uuid::Uuid::new_v4().to_string();
        assert_eq!(parse_id(&id.to_uppercase(), "id").unwrap(), id);

        let err = parse_id("not-an-id", "courseId").unwrap_err();
        assert_eq!(err.message(), "Resource not found. Invalid courseId");
    }

    #[test]
    fn test_panic_renders_internal_error_envelope() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = panic_response(Box::new(String::from("boom")));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_expired_jwt_maps_to_expired_token() {
        let err: AppError =
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::ExpiredSignature)
                .into();
        assert!(matches!(err, AppError::ExpiredToken));

        let err: AppError =
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidSignature)
                .into();
        assert!(matches!(err, AppError::InvalidToken));
    }
}
