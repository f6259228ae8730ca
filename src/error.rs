// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // Question source missing or malformed. Fatal at startup.
    DataLoad(String),

    // Score store unavailable while appending an attempt.
    StoreWrite(String),

    // Score store unavailable while reading the leaderboard.
    StoreRead(String),

    // 400 Bad Request (e.g., empty player name)
    InvalidInput(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (action not valid in the current quiz state)
    Conflict(String),

    // Invalid or incomplete environment configuration.
    Configuration(String),

    // 500 Internal Server Error
    InternalServerError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DataLoad(msg) => write!(f, "failed to load questions: {}", msg),
            AppError::StoreWrite(msg) => write!(f, "failed to save score: {}", msg),
            AppError::StoreRead(msg) => write!(f, "failed to read leaderboard: {}", msg),
            AppError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            AppError::NotFound(msg) => write!(f, "not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "conflict: {}", msg),
            AppError::Configuration(msg) => write!(f, "configuration error: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::DataLoad(msg)
            | AppError::Configuration(msg)
            | AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::StoreWrite(msg) | AppError::StoreRead(msg) => {
                tracing::warn!("Score store unavailable: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "Score store temporarily unavailable".to_string(),
                )
            }
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
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

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        let cases = [
            (AppError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::StoreRead("x".into()), StatusCode::BAD_GATEWAY),
            (AppError::DataLoad("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
