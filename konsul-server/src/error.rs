//! HTTP error type.
//!
//! Every route returns `Result<T, ApiError>`. Client errors expose their message; internal
//! errors are logged with full detail and answered with a generic body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use keyed_lock::LockError;
use konsul_core::KonsulError;
use serde_json::json;
use storage::StorageError;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let client_message = match self {
            ApiError::BadRequest(m)
            | ApiError::Unauthorized(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m) => m,
            ApiError::Internal(m) => {
                error!(message = %m, "internal server error");
                "internal server error".to_owned()
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<KonsulError> for ApiError {
    fn from(e: KonsulError) -> Self {
        match e {
            KonsulError::Validation(m) => ApiError::BadRequest(m),
            KonsulError::Handler(h) => ApiError::BadRequest(h.to_string()),
            KonsulError::Unauthorized(m) => ApiError::Unauthorized(m),
            KonsulError::Forbidden(m) => ApiError::Forbidden(m),
            KonsulError::NotFound(m) => ApiError::NotFound(m),
            KonsulError::Conflict(m) => ApiError::Conflict(m),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        KonsulError::from(e).into()
    }
}

impl From<LockError> for ApiError {
    fn from(e: LockError) -> Self {
        ApiError::Conflict(e.to_string())
    }
}
