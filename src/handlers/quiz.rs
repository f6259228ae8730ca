// src/handlers/quiz.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        attempt::LeaderboardParams,
        session::{SelectOptionRequest, StartSessionRequest, SubmitAnswerRequest},
    },
    services::session_service::QuizService,
};

/// Starts a new quiz session.
///
/// * Validates the player name (non-blank).
/// * Shuffles the question bank for this session and starts the first timer.
/// * Returns 201 Created and the first render view.
pub async fn create_session(
    State(quiz): State<QuizService>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_start(&payload)?;

    let view = quiz.create_session(&payload.player_name).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Starts a session again after a restart, optionally under a new name.
pub async fn start_session(
    State(quiz): State<QuizService>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_start(&payload)?;

    Ok(Json(quiz.start_session(id, &payload.player_name).await?))
}

/// Recomputes and renders the session.
///
/// Clients poll this every `refresh_interval_ms`. Times out the current
/// question when its budget is spent; otherwise changes nothing.
pub async fn render_session(
    State(quiz): State<QuizService>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(quiz.render(id).await?))
}

/// Records the selected option for the current question.
pub async fn select_option(
    State(quiz): State<QuizService>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SelectOptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(quiz.select(id, payload).await?))
}

/// Submits the current question and moves on.
///
/// The body is optional; an empty body submits whatever is already selected.
pub async fn submit_answer(
    State(quiz): State<QuizService>,
    Path(id): Path<Uuid>,
    payload: Option<Json<SubmitAnswerRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let req = payload.map(|Json(req)| req).unwrap_or_default();
    Ok(Json(quiz.submit(id, req).await?))
}

/// Clears a completed run. Saved scores are kept.
pub async fn restart_session(
    State(quiz): State<QuizService>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(quiz.restart(id).await?))
}

/// Retrieves the top 5 attempts and, if `player` is given, that player's rank.
pub async fn get_leaderboard(
    State(quiz): State<QuizService>,
    Query(params): Query<LeaderboardParams>,
) -> impl IntoResponse {
    Json(quiz.leaderboard(params.player.as_deref()).await)
}

fn validate_start(payload: &StartSessionRequest) -> Result<(), AppError> {
    if payload.player_name.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Please enter your name to play.".to_string(),
        ));
    }
    payload.validate()?;
    Ok(())
}
