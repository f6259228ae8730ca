// src/models/view.rs

use serde::Serialize;
use uuid::Uuid;

/// Everything a client needs to draw one frame of the quiz.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub player_name: String,
    pub score: u32,
    pub answered: usize,
    pub total_questions: usize,
    #[serde(flatten)]
    pub stage: Stage,
    /// Result of the transition that happened during this pass, if any.
    pub feedback: Option<Feedback>,
    pub leaderboard: Option<LeaderboardPanel>,
    /// Non-fatal problems (e.g., the score could not be saved).
    pub notices: Vec<String>,
    /// How often the client should poll for the next frame.
    pub refresh_interval_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Stage {
    NotStarted,
    InProgress {
        question: QuestionView,
        timer: TimerView,
    },
    Completed {
        summary: SummaryView,
    },
}

#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub index: usize,
    /// "Question 3 of 10".
    pub caption: String,
    /// Fraction of questions already answered, 0.0..=1.0.
    pub progress: f64,
    pub prompt: String,
    pub options: Vec<String>,
    pub selected: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerView {
    pub remaining_secs: i64,
    pub limit_secs: i64,
    pub urgent: bool,
    pub color: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Correct,
    Wrong,
    TimedOut,
}

#[derive(Debug, Serialize)]
pub struct Feedback {
    pub question_index: usize,
    pub outcome: Outcome,
    pub message: String,
    pub correct_answer: String,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardRow {
    pub position: usize,
    pub name: String,
    pub score: u32,
    pub total: u32,
    pub percentage: f64,
    pub crown: bool,
    pub color: String,
}

/// Horizontal bar chart of the top players. Bars are ordered bottom-up.
#[derive(Debug, Serialize)]
pub struct ChartView {
    pub bars: Vec<ChartBar>,
    pub x_max: u32,
    pub empty_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChartBar {
    pub name: String,
    pub score: u32,
    /// Drives the bar colour scale.
    pub percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardPanel {
    pub rows: Vec<LeaderboardRow>,
    pub player_rank: Option<usize>,
    pub chart: ChartView,
}

#[derive(Debug, Serialize)]
pub struct SummaryView {
    pub score: u32,
    pub total: u32,
    pub percentage: f64,
    pub player_rank: Option<usize>,
    pub message: String,
    pub celebrate: bool,
}

/// Body of `GET /api/quiz/leaderboard`.
#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    #[serde(flatten)]
    pub panel: LeaderboardPanel,
    pub notices: Vec<String>,
}
