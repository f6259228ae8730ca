use std::{sync::Arc, time::Duration};

use axum::extract::FromRef;

use crate::{
    config::Config,
    models::question::Question,
    services::{quiz::TimerRules, score_store::ScoreStore, session_service::QuizService},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub quiz: QuizService,
}

impl AppState {
    pub fn new(config: Config, questions: Arc<[Question]>, store: Arc<dyn ScoreStore>) -> Self {
        let rules = TimerRules {
            limit_secs: config.question_time_limit_secs,
            warning_secs: config.timer_warning_secs,
        };
        let quiz = QuizService::new(
            questions,
            store,
            rules,
            config.refresh_interval_ms,
            Duration::from_secs(config.session_idle_secs),
        );
        AppState { config, quiz }
    }
}

impl FromRef<AppState> for QuizService {
    fn from_ref(state: &AppState) -> Self {
        state.quiz.clone()
    }
}
