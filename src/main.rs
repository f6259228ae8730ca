// src/main.rs

use std::time::Duration;

use dotenvy::dotenv;
use quiz_server::config::Config;
use quiz_server::routes;
use quiz_server::services::question_bank::QuestionBank;
use quiz_server::services::score_store::build_store;
use quiz_server::state::AppState;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env()?;

    let file_appender = tracing_appender::rolling::daily("logs", "quiz.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // A bad question source halts startup.
    let bank = QuestionBank::new(&config.questions_path);
    let questions = bank.load_questions().inspect_err(|e| {
        tracing::error!("{}", e);
    })?;

    let store = build_store(&config)?;
    tracing::info!("Score store: {:?}", config.store_backend);

    // Create AppState
    let state = AppState::new(config.clone(), questions, store);

    // Sweep at a tenth of the idle window, at least once a second.
    let sweep_every = Duration::from_secs((config.session_idle_secs / 10).max(1));
    state.quiz.spawn_session_sweeper(sweep_every);

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Quiz server listening on {}", config.bind_addr);

    // Start the server
    axum::serve(listener, app).await?;

    Ok(())
}
