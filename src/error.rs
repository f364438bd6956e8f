// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Errors raised while resolving or sanitizing a field.
///
/// Missing content and malformed HTML are not errors; they resolve to an
/// empty string and to normalized markup respectively.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FieldError {
    /// A user supplied resolve/compute callback failed.
    #[error("field callback failed: {0}")]
    Callback(#[source] anyhow::Error),

    /// A purifier override had an unknown name or an ill-typed value.
    #[error("invalid purifier option '{option}': {reason}")]
    InvalidPolicy { option: String, reason: String },
}

impl FieldError {
    pub(crate) fn invalid_policy(option: &str, reason: impl Into<String>) -> Self {
        FieldError::InvalidPolicy {
            option: option.to_string(),
            reason: reason.into(),
        }
    }
}

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Policy mistakes come from the request body; callback failures are ours.
impl From<FieldError> for AppError {
    fn from(err: FieldError) -> Self {
        match err {
            FieldError::InvalidPolicy { .. } => AppError::BadRequest(err.to_string()),
            FieldError::Callback(_) => AppError::InternalServerError(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
