// src/services/quiz.rs

//! Quiz state machine.
//!
//! `NotStarted -> InProgress(0) -> ... -> InProgress(n-1) -> Completed`, and
//! `Completed -> NotStarted` on restart. Every function takes the session by
//! value together with the current time and hands back the next session.
//! Persisting the resulting attempt record is the caller's job.

use chrono::{DateTime, Utc};
use rand::{Rng, seq::SliceRandom};

use crate::{
    error::AppError,
    models::{
        attempt::AttemptRecord,
        question::Question,
        session::{QuizSession, SessionPhase},
        view::Outcome,
    },
    utils::color,
};

/// Per-question time budget and warning threshold, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerRules {
    pub limit_secs: i64,
    pub warning_secs: i64,
}

impl Default for TimerRules {
    fn default() -> Self {
        TimerRules {
            limit_secs: 15,
            warning_secs: 5,
        }
    }
}

/// What moved the session past a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Submitted,
    TimedOut,
}

/// Result of advancing past one question.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub question_index: usize,
    pub trigger: Trigger,
    pub correct: bool,
    pub correct_answer: String,
    /// Cumulative score after this question, ready for the score store.
    pub record: AttemptRecord,
}

impl Transition {
    pub fn outcome(&self) -> Outcome {
        match (self.correct, self.trigger) {
            (true, _) => Outcome::Correct,
            (false, Trigger::TimedOut) => Outcome::TimedOut,
            (false, Trigger::Submitted) => Outcome::Wrong,
        }
    }
}

/// `max(limit - elapsed, 0)`, never above `limit`.
pub fn remaining(limit_secs: i64, elapsed_secs: i64) -> i64 {
    (limit_secs - elapsed_secs.max(0)).clamp(0, limit_secs)
}

/// Seconds left on question `index`. A question that was never displayed
/// still has its full budget.
pub fn remaining_secs(
    session: &QuizSession,
    index: usize,
    now: DateTime<Utc>,
    rules: TimerRules,
) -> i64 {
    match session.timer_starts.get(&index) {
        // Whole seconds, truncated, like a wall clock read once per pass.
        Some(started) => remaining(rules.limit_secs, (now - *started).num_seconds()),
        None => rules.limit_secs,
    }
}

/// `NotStarted -> InProgress(0)`: shuffles the bank once for this session.
pub fn start<R: Rng + ?Sized>(
    mut session: QuizSession,
    player_name: &str,
    bank: &[Question],
    rng: &mut R,
) -> Result<QuizSession, AppError> {
    if session.phase() != SessionPhase::NotStarted {
        return Err(AppError::Conflict("quiz already started".to_string()));
    }

    let player_name = player_name.trim();
    if player_name.is_empty() {
        return Err(AppError::InvalidInput(
            "Please enter your name to play.".to_string(),
        ));
    }
    if bank.is_empty() {
        return Err(AppError::DataLoad("question bank is empty".to_string()));
    }

    let mut order = bank.to_vec();
    order.shuffle(rng);

    session.player_name = player_name.to_string();
    session.question_order = order;
    session.current_index = 0;
    session.score = 0;
    session.timer_starts.clear();
    session.answers.clear();
    session.colors = color::palette(rng);

    Ok(session)
}

/// Marks the current question as displayed. Only the first display counts.
pub fn touch(mut session: QuizSession, now: DateTime<Utc>) -> QuizSession {
    if let SessionPhase::InProgress { index } = session.phase() {
        session.timer_starts.entry(index).or_insert(now);
    }
    session
}

/// Records the player's choice for the current question.
///
/// Rejected once the question's time is up.
pub fn select(
    mut session: QuizSession,
    option: &str,
    now: DateTime<Utc>,
    rules: TimerRules,
) -> Result<QuizSession, AppError> {
    let index = current_index(&session)?;
    session = touch(session, now);

    if remaining_secs(&session, index, now, rules) == 0 {
        return Err(AppError::Conflict("time is up for this question".to_string()));
    }

    let question = &session.question_order[index];
    if !question.has_option(option) {
        return Err(AppError::InvalidInput(format!(
            "'{}' is not an option for this question",
            option
        )));
    }

    session.answers.insert(index, Some(option.to_string()));
    Ok(session)
}

/// Player pressed submit.
///
/// If the timer already ran out, the submit is not honoured and the
/// question times out instead, still scoring whatever was selected in time.
pub fn submit(
    session: QuizSession,
    now: DateTime<Utc>,
    rules: TimerRules,
) -> Result<(QuizSession, Transition), AppError> {
    let index = current_index(&session)?;
    let session = touch(session, now);

    let trigger = if remaining_secs(&session, index, now, rules) == 0 {
        Trigger::TimedOut
    } else {
        Trigger::Submitted
    };

    Ok(advance(session, trigger))
}

/// Times out the current question if its budget is spent.
///
/// A question that was never displayed cannot expire.
pub fn expire_if_due(
    session: QuizSession,
    now: DateTime<Utc>,
    rules: TimerRules,
) -> (QuizSession, Option<Transition>) {
    let SessionPhase::InProgress { index } = session.phase() else {
        return (session, None);
    };
    if !session.timer_starts.contains_key(&index) {
        return (session, None);
    }
    if remaining_secs(&session, index, now, rules) > 0 {
        return (session, None);
    }

    let (session, transition) = advance(session, Trigger::TimedOut);
    (session, Some(transition))
}

/// `Completed -> NotStarted`. The player name is kept so the client can
/// offer it again; everything else about the run is discarded.
pub fn restart(session: QuizSession) -> Result<QuizSession, AppError> {
    if session.phase() != SessionPhase::Completed {
        return Err(AppError::Conflict(
            "restart is only available once the quiz is complete".to_string(),
        ));
    }

    let mut fresh = QuizSession::new(session.id);
    fresh.player_name = session.player_name;
    Ok(fresh)
}

fn current_index(session: &QuizSession) -> Result<usize, AppError> {
    match session.phase() {
        SessionPhase::InProgress { index } => Ok(index),
        SessionPhase::NotStarted => Err(AppError::Conflict("quiz has not started".to_string())),
        SessionPhase::Completed => Err(AppError::Conflict("quiz is already complete".to_string())),
    }
}

/// `InProgress(i) -> InProgress(i+1)` (or `Completed`). Caller guarantees
/// the session is in progress.
fn advance(mut session: QuizSession, trigger: Trigger) -> (QuizSession, Transition) {
    let index = session.current_index;
    let question = &session.question_order[index];

    let correct = question.is_correct(session.selected(index));
    let correct_answer = question.answer.clone();

    if correct {
        session.score += 1;
    }
    session.answers.entry(index).or_insert(None);
    session.current_index += 1;

    let answered = u32::try_from(index + 1).unwrap_or(u32::MAX);
    let record = AttemptRecord::new(session.player_name.clone(), session.score, answered);

    tracing::debug!(
        "Session {} advanced past question {} ({:?}, correct: {})",
        session.id,
        index,
        trigger,
        correct
    );

    let transition = Transition {
        question_index: index,
        trigger,
        correct,
        correct_answer,
        record,
    };
    (session, transition)
}
