// src/models/session.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::question::Question;

/// Where a session stands in the quiz lifecycle. Derived from the session fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionPhase {
    NotStarted,
    InProgress { index: usize },
    Completed,
}

/// One player's run through a shuffled question order.
///
/// Passed by value into the transition functions in `services::quiz` and
/// returned from them; nothing about a session lives outside this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSession {
    pub id: Uuid,

    /// Empty until the session is started.
    pub player_name: String,

    /// A permutation of the question bank, fixed once started.
    pub question_order: Vec<Question>,

    /// `0 <= current_index <= question_order.len()`.
    pub current_index: usize,

    /// Never exceeds `current_index`.
    pub score: u32,

    /// When each question was first displayed.
    pub timer_starts: BTreeMap<usize, DateTime<Utc>>,

    /// Selected option per question. `None` means unanswered.
    pub answers: BTreeMap<usize, Option<String>>,

    /// Row colours for the leaderboard, fixed per session.
    pub colors: Vec<String>,
}

impl QuizSession {
    pub fn new(id: Uuid) -> Self {
        QuizSession {
            id,
            player_name: String::new(),
            question_order: Vec::new(),
            current_index: 0,
            score: 0,
            timer_starts: BTreeMap::new(),
            answers: BTreeMap::new(),
            colors: Vec::new(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.question_order.is_empty() {
            SessionPhase::NotStarted
        } else if self.current_index < self.question_order.len() {
            SessionPhase::InProgress {
                index: self.current_index,
            }
        } else {
            SessionPhase::Completed
        }
    }

    pub fn total_questions(&self) -> usize {
        self.question_order.len()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.question_order.get(self.current_index)
    }

    pub fn selected(&self, index: usize) -> Option<&str> {
        self.answers.get(&index).and_then(|a| a.as_deref())
    }
}

/// DTO for starting a session.
#[derive(Debug, Deserialize, Validate)]
pub struct StartSessionRequest {
    #[validate(length(max = 50), custom(function = validate_player_name))]
    pub player_name: String,
}

/// DTO for choosing an option on the current question.
#[derive(Debug, Deserialize)]
pub struct SelectOptionRequest {
    pub option: String,
    /// Index the client believes is current; stale actions are rejected.
    pub question_index: Option<usize>,
}

/// DTO for submitting the current question.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitAnswerRequest {
    /// Optional last-moment selection, applied before submitting.
    pub option: Option<String>,
    pub question_index: Option<usize>,
}

fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("player_name_required"));
    }
    Ok(())
}
