//! HTTP error types for the `CredVault` server.
//!
//! Maps domain errors from `credvault-core` into HTTP responses. Every
//! variant produces a JSON body with a machine-readable `error` field and a
//! human-readable `message`; validation failures add a `fields` map.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{debug, error};

use credvault_core::error::{AuthError, FieldErrors, StoreError};

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// No valid session.
    Unauthorized(String),
    /// Authenticated, but the request is not allowed (CSRF).
    Forbidden(String),
    /// Requested resource not found for this user.
    NotFound(String),
    /// Client sent invalid input.
    BadRequest(String),
    /// One or more fields failed validation.
    Validation(FieldErrors),
    /// Internal server error. The detail is logged, not returned.
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<FieldErrors>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message, fields) = match self {
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            Self::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                "validation",
                "Please correct the errors below.".to_owned(),
                Some(fields),
            ),
            Self::Internal(detail) => {
                error!(error = %detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_owned(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: error_type,
            message,
            fields,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            StoreError::Invalid(fields) => Self::Validation(fields),
            StoreError::Crypto(_) | StoreError::Serialization { .. } | StoreError::Storage(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized("Invalid username or password.".to_owned()),
            AuthError::UsernameTaken { .. } => Self::Validation(FieldErrors::single(
                "username",
                "A user with that username already exists.",
            )),
            AuthError::Invalid(fields) => Self::Validation(fields),
            AuthError::SessionNotFound | AuthError::SessionExpired { .. } | AuthError::UserNotFound => {
                Self::Unauthorized(err.to_string())
            }
            AuthError::Hashing { .. }
            | AuthError::TtlOutOfRange { .. }
            | AuthError::Serialization { .. }
            | AuthError::Storage(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(error = %rejection.body_text(), "rejected request body");
        Self::BadRequest("Invalid JSON data".to_owned())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        debug!(error = %rejection.body_text(), "rejected path parameter");
        Self::NotFound("Not found.".to_owned())
    }
}
