//! HTTP error types and mappings.
//!
//! Every failure the web API reports leaves as `{ "error": "..." }` with a
//! matching status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use prdkit_core::{BackendError, ValidationError};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Message shown when the backend cannot be reached at all.
pub const BACKEND_UNREACHABLE_MESSAGE: &str =
    "Failed to connect to Ollama. Make sure Ollama is running.";

/// Web API error.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Bad request (invalid input).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The backend failed before any output was produced.
    #[error("Backend error: {0}")]
    Backend(BackendError),

    /// The backend answered, but with something unusable.
    #[error("Bad gateway: {0}")]
    BadGateway(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HttpError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Backend(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text placed in the `error` field.
    pub fn message(&self) -> String {
        match self {
            Self::BadRequest(msg) | Self::BadGateway(msg) | Self::Internal(msg) => msg.clone(),
            Self::Backend(e) if e.is_unreachable() => BACKEND_UNREACHABLE_MESSAGE.to_string(),
            Self::Backend(e) => e.to_string(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, axum::Json(ErrorResponse::new(self.message()))).into_response()
    }
}

impl From<ValidationError> for HttpError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<BackendError> for HttpError {
    fn from(err: BackendError) -> Self {
        Self::Backend(err)
    }
}
