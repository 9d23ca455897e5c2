// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Every failure a service or handler can produce ends up here and is
/// mapped to a status code plus a stable machine-readable `code`.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request: missing or malformed fields, broken invariants
    InvalidInput(String),

    // 401 Unauthorized: no or bad credentials
    AuthError(String),

    // 403 Forbidden: the principal does not own the resource
    NotAuthorized(String),

    // 403 Forbidden: submission outside the attempt window
    SubmissionWindowClosed(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., duplicate login id)
    Conflict(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InternalServerError(_) => "INTERNAL_ERROR",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::AuthError(_) => "UNAUTHENTICATED",
            AppError::NotAuthorized(_) => "NOT_AUTHORIZED",
            AppError::SubmissionWindowClosed(_) => "SUBMISSION_WINDOW_CLOSED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::NotAuthorized(_) | AppError::SubmissionWindowClosed(_) => {
                StatusCode::FORBIDDEN
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InternalServerError(msg)
            | AppError::InvalidInput(msg)
            | AppError::AuthError(msg)
            | AppError::NotAuthorized(msg)
            | AppError::SubmissionWindowClosed(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => write!(f, "{}: {}", self.code(), msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Converts the error into a JSON response with appropriate HTTP status code.
/// Internal details are logged and replaced by a generic message.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let error_message = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                "Internal Server Error".to_string()
            }
            AppError::InvalidInput(msg)
            | AppError::AuthError(msg)
            | AppError::NotAuthorized(msg)
            | AppError::SubmissionWindowClosed(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg,
        };
        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            other => AppError::InternalServerError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
