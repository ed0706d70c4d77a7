//! Error taxonomy for the portfolio service
//!
//! Every variant maps to one HTTP status and a machine-readable code.
//! Messages sent to clients stay generic; the detail lives in server-side
//! logs at the point the error was raised.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::media_host::MediaHostError;

/// Request-handling failures
#[derive(Error, Debug)]
pub enum ApiError {
    /// Bad input shape, type, or size; raised before any remote call
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid, or expired authentication
    ///
    /// Deliberately uniform for unknown usernames and wrong passwords.
    #[error("Invalid username or password")]
    Unauthorized,

    /// Too many failed login attempts in the window
    #[error("Too many login attempts, please try again later")]
    Throttled,

    /// Unknown record id
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Duplicate identity
    #[error("{0}")]
    Conflict(String),

    /// The media host rejected or failed an upload
    #[error("Error uploading image")]
    Upload(String),

    /// The media host failed to remove an object
    #[error("Error deleting image")]
    Deletion(String),

    /// Database failure after a successful remote side effect; the two
    /// stores have diverged and need reconciliation
    #[error("Upload could not be recorded")]
    Persistence(String),

    /// Database failure
    #[error("Database error")]
    Database(#[from] common::error::DatabaseError),

    /// Anything else
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    /// Log an unexpected failure and collapse it to a generic 500
    pub fn internal(err: anyhow::Error) -> Self {
        tracing::error!("internal error: {:#}", err);
        ApiError::Internal
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Throttled => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upload(_) | ApiError::Deletion(_) => StatusCode::BAD_GATEWAY,
            ApiError::Persistence(_) | ApiError::Database(_) | ApiError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Unauthorized => "UNAUTHENTICATED",
            ApiError::Throttled => "TOO_MANY_ATTEMPTS",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Upload(_) => "UPLOAD_FAILED",
            ApiError::Deletion(_) => "DELETION_FAILED",
            ApiError::Persistence(_) => "PERSISTENCE_ANOMALY",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::Internal => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Upload(detail) | ApiError::Deletion(detail) => {
                tracing::error!("media host failure: {}", detail);
            }
            ApiError::Persistence(detail) => {
                tracing::error!("persistence anomaly: {}", detail);
            }
            ApiError::Database(err) => {
                tracing::error!("database failure: {}", err);
            }
            _ => {}
        }

        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
            "code": self.code(),
        }));

        (self.status(), body).into_response()
    }
}

impl From<MediaHostError> for ApiError {
    fn from(err: MediaHostError) -> Self {
        match err {
            MediaHostError::Upload(detail) | MediaHostError::Fetch(detail) => {
                ApiError::Upload(detail)
            }
            MediaHostError::Delete(detail) => ApiError::Deletion(detail),
        }
    }
}

/// Type alias for handler results
pub type ApiResult<T> = Result<T, ApiError>;
