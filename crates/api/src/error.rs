//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use doc_store::StoreError;
use reputation::ReputationError;
use serde::Serialize;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
///
/// Every variant carries one of the four callable error codes.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or unknown admin credentials.
    #[error("{0}")]
    Unauthenticated(String),
    /// Bad request from the client.
    #[error("{0}")]
    InvalidArgument(String),
    /// Resource not found.
    #[error("{0}")]
    NotFound(String),
    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'static str,
    error: &'a str,
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated(_) => "unauthenticated",
            ApiError::InvalidArgument(_) => "invalid-argument",
            ApiError::NotFound(_) => "not-found",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(msg) = &self {
            tracing::error!(error = %msg, "internal server error");
        }

        let message = self.to_string();
        let body = ErrorBody {
            code: self.code(),
            error: &message,
        };
        (self.status(), axum::Json(body)).into_response()
    }
}

impl From<ReputationError> for ApiError {
    fn from(err: ReputationError) -> Self {
        match err {
            ReputationError::Validation(msg) => ApiError::InvalidArgument(msg),
            ReputationError::NotFound(id) => ApiError::NotFound(format!("Subject {id} not found")),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::from(ReputationError::from(err))
    }
}
