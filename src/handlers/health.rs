// src/handlers/health.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::services::session_service::QuizService;

/// Liveness probe. Reports how many sessions this process is holding.
pub async fn health(State(quiz): State<QuizService>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "sessions": quiz.sessions().len(),
    }))
}
