// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{health, quiz},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Quiz session routes and the leaderboard under `/api/quiz`.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (quiz service, config).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let quiz_routes = Router::new()
        .route("/sessions", post(quiz::create_session))
        .route("/sessions/{id}", get(quiz::render_session))
        .route("/sessions/{id}/start", post(quiz::start_session))
        .route("/sessions/{id}/selection", put(quiz::select_option))
        .route("/sessions/{id}/submit", post(quiz::submit_answer))
        .route("/sessions/{id}/restart", post(quiz::restart_session))
        .route("/leaderboard", get(quiz::get_leaderboard));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/quiz", quiz_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
