//! Application error types and HTTP response mapping.
//!
//! Defines `ApiError` for all error conditions and implements Axum's
//! `IntoResponse` to automatically convert errors to appropriate HTTP
//! responses with JSON error bodies.
//!
//! Error mappings:
//! - `NotFound` → 404
//! - `Ambiguous` → 422
//! - `InvalidArgument` → 400
//! - `Unavailable` → 501
//! - `Git`, `Internal` → 500

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("ambiguous: {0}")]
    Ambiguous(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            ApiError::Git(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("not found: {}", what)),
            ApiError::Ambiguous(what) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("ambiguous: {}", what),
            ),
            ApiError::InvalidArgument(what) => {
                (StatusCode::BAD_REQUEST, format!("invalid argument: {}", what))
            }
            ApiError::Unavailable(what) => {
                (StatusCode::NOT_IMPLEMENTED, format!("unavailable: {}", what))
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
