// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Every variant is recoverable and ends up as a JSON message for the caller.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized (missing, invalid or revoked credentials)
    AuthError(String),

    // 403 Forbidden (authenticated, but not allowed here)
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., duplicate username)
    Conflict(String),

    // 409: a second exam start while one is still open
    DuplicateSession(String),

    // 409: write attempted after the exam deadline
    SessionExpired(String),

    // 409: write attempted on a sealed exam
    SessionFinalized(String),

    // 409: results requested before the exam is sealed
    ExamInProgress(String),
}

impl AppError {
    /// Machine-readable kind, sent next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InternalServerError(_) => "internal_error",
            AppError::BadRequest(_) => "bad_request",
            AppError::AuthError(_) => "unauthenticated",
            AppError::Forbidden(_) => "unauthorized_access",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::DuplicateSession(_) => "duplicate_session",
            AppError::SessionExpired(_) => "session_expired",
            AppError::SessionFinalized(_) => "session_finalized",
            AppError::ExamInProgress(_) => "exam_in_progress",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg)
            | AppError::DuplicateSession(msg)
            | AppError::SessionExpired(msg)
            | AppError::SessionFinalized(msg)
            | AppError::ExamInProgress(msg) => (StatusCode::CONFLICT, msg),
        };
        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// True when the database rejected a write because of a UNIQUE constraint.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
