// src/services/presenter.rs

//! Builds the view structs clients render. No I/O happens here.

use crate::{
    models::{
        attempt::LeaderboardView,
        session::QuizSession,
        view::{
            ChartBar, ChartView, Feedback, LeaderboardPanel, LeaderboardRow, Outcome,
            QuestionView, SummaryView, TimerView,
        },
    },
    services::quiz::{TimerRules, Transition},
    utils::{color::random_color, score::percentage},
};

pub const EMPTY_CHART_MESSAGE: &str = "No scores yet. Be the first to play!";

pub fn timer_view(remaining_secs: i64, rules: TimerRules) -> TimerView {
    let urgent = remaining_secs <= rules.warning_secs;
    TimerView {
        remaining_secs,
        limit_secs: rules.limit_secs,
        urgent,
        color: if urgent { "red" } else { "black" },
    }
}

/// View of the question at `session.current_index`. `None` once complete.
pub fn question_view(session: &QuizSession) -> Option<QuestionView> {
    let index = session.current_index;
    let question = session.current_question()?;
    let total = session.total_questions();

    Some(QuestionView {
        index,
        caption: format!("Question {} of {}", index + 1, total),
        progress: index as f64 / total as f64,
        prompt: question.prompt.clone(),
        options: question.options.clone(),
        selected: session.selected(index).map(str::to_string),
    })
}

pub fn feedback_view(transition: &Transition) -> Feedback {
    let outcome = transition.outcome();
    let message = match outcome {
        Outcome::Correct => "Correct!".to_string(),
        Outcome::Wrong => format!("Wrong! Correct answer: {}", transition.correct_answer),
        Outcome::TimedOut => format!("Time's up! Correct answer: {}", transition.correct_answer),
    };

    Feedback {
        question_index: transition.question_index,
        outcome,
        message,
        correct_answer: transition.correct_answer.clone(),
    }
}

/// Leaderboard rows plus chart data. `colors` are the session's row colours;
/// rows beyond them get a fresh random colour.
pub fn leaderboard_panel(view: &LeaderboardView, colors: &[String]) -> LeaderboardPanel {
    let rows = view
        .top5
        .iter()
        .enumerate()
        .map(|(i, record)| LeaderboardRow {
            position: i + 1,
            name: record.name.clone(),
            score: record.score,
            total: record.total,
            percentage: record.percentage,
            crown: i == 0,
            color: colors
                .get(i)
                .cloned()
                .unwrap_or_else(|| random_color(&mut rand::rng())),
        })
        .collect();

    LeaderboardPanel {
        rows,
        player_rank: view.player_rank,
        chart: chart_view(view),
    }
}

/// Horizontal bars draw bottom-up, so the best row goes last.
pub fn chart_view(view: &LeaderboardView) -> ChartView {
    if view.top5.is_empty() {
        return ChartView {
            bars: Vec::new(),
            x_max: 1,
            empty_message: Some(EMPTY_CHART_MESSAGE.to_string()),
        };
    }

    let x_max = view.top5.iter().map(|r| r.score).max().unwrap_or(0) + 1;
    let bars = view
        .top5
        .iter()
        .rev()
        .map(|record| ChartBar {
            name: record.name.clone(),
            score: record.score,
            percentage: record.percentage,
        })
        .collect();

    ChartView {
        bars,
        x_max,
        empty_message: None,
    }
}

/// Final score and a message that depends on where the player landed.
pub fn summary_view(session: &QuizSession, player_rank: Option<usize>) -> SummaryView {
    let total = u32::try_from(session.total_questions()).unwrap_or(u32::MAX);
    let name = &session.player_name;

    let (message, celebrate) = match player_rank {
        Some(1) => (
            format!("Amazing {}! You are the top scorer!", name),
            true,
        ),
        Some(rank) if rank <= 3 => (format!("Great job {}! You are in the top 3!", name), true),
        Some(rank) => (
            format!("Well done {}! Your final rank: #{}", name, rank),
            false,
        ),
        None => (
            format!("Well done {}! Your rank is not available right now.", name),
            false,
        ),
    };

    SummaryView {
        score: session.score,
        total,
        percentage: percentage(session.score, total),
        player_rank,
        message,
        celebrate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{attempt::AttemptRecord, question::Question};
    use uuid::Uuid;

    fn session_with(n: usize, index: usize, score: u32) -> QuizSession {
        let mut session = QuizSession::new(Uuid::new_v4());
        session.player_name = "Ada".to_string();
        session.question_order = (0..n)
            .map(|i| Question {
                prompt: format!("Q{}", i),
                options: vec!["A".to_string(), "B".to_string()],
                answer: "A".to_string(),
            })
            .collect();
        session.current_index = index;
        session.score = score;
        session
    }

    #[test]
    fn timer_turns_urgent_at_warning_threshold() {
        let rules = TimerRules::default();
        assert!(!timer_view(6, rules).urgent);
        let urgent = timer_view(5, rules);
        assert!(urgent.urgent);
        assert_eq!(urgent.color, "red");
        assert!(timer_view(0, rules).urgent);
    }

    #[test]
    fn question_view_reports_progress() {
        let view = question_view(&session_with(4, 1, 1)).unwrap();
        assert_eq!(view.caption, "Question 2 of 4");
        assert_eq!(view.progress, 0.25);
        assert_eq!(view.prompt, "Q1");
        assert!(question_view(&session_with(4, 4, 1)).is_none());
    }

    #[test]
    fn chart_is_reversed_with_headroom() {
        let view = LeaderboardView {
            top5: vec![
                AttemptRecord::new("Ada", 3, 3),
                AttemptRecord::new("Bob", 1, 3),
            ],
            player_rank: Some(1),
        };
        let chart = chart_view(&view);
        assert_eq!(chart.x_max, 4);
        assert_eq!(chart.bars[0].name, "Bob");
        assert_eq!(chart.bars[1].name, "Ada");
        assert!(chart.empty_message.is_none());
    }

    #[test]
    fn empty_leaderboard_shows_placeholder() {
        let panel = leaderboard_panel(&LeaderboardView::default(), &[]);
        assert!(panel.rows.is_empty());
        assert_eq!(panel.player_rank, None);
        assert_eq!(panel.chart.empty_message.as_deref(), Some(EMPTY_CHART_MESSAGE));
    }

    #[test]
    fn first_row_wears_the_crown_and_session_colours() {
        let view = LeaderboardView {
            top5: vec![
                AttemptRecord::new("Ada", 3, 3),
                AttemptRecord::new("Bob", 1, 3),
            ],
            player_rank: None,
        };
        let colors = vec!["rgb(200,200,200)".to_string()];
        let panel = leaderboard_panel(&view, &colors);
        assert!(panel.rows[0].crown);
        assert!(!panel.rows[1].crown);
        assert_eq!(panel.rows[0].color, "rgb(200,200,200)");
        assert!(panel.rows[1].color.starts_with("rgb("));
    }

    #[test]
    fn summary_message_depends_on_rank() {
        let session = session_with(3, 3, 1);
        let top = summary_view(&session, Some(1));
        assert!(top.message.contains("top scorer"));
        assert!(top.celebrate);

        assert!(summary_view(&session, Some(3)).message.contains("top 3"));

        let far = summary_view(&session, Some(9));
        assert!(far.message.contains("#9"));
        assert!(!far.celebrate);

        let summary = summary_view(&session, None);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.percentage, 33.33);
    }

    #[test]
    fn names_are_passed_through_verbatim() {
        let view = LeaderboardView {
            top5: vec![AttemptRecord::new("Ada Lovelace", 3, 3)],
            player_rank: Some(1),
        };
        let panel = leaderboard_panel(&view, &[]);
        assert_eq!(panel.rows[0].name, "Ada Lovelace");
        assert_eq!(panel.chart.bars[0].name, "Ada Lovelace");

        let mut session = session_with(3, 3, 3);
        session.player_name = "Ada Lovelace".to_string();
        assert_eq!(
            summary_view(&session, Some(1)).message,
            "Amazing Ada Lovelace! You are the top scorer!"
        );
    }

    #[test]
    fn feedback_names_the_correct_answer() {
        let transition = Transition {
            question_index: 0,
            trigger: crate::services::quiz::Trigger::TimedOut,
            correct: false,
            correct_answer: "Paris".to_string(),
            record: AttemptRecord::new("Ada", 0, 1),
        };
        let feedback = feedback_view(&transition);
        assert_eq!(feedback.outcome, Outcome::TimedOut);
        assert_eq!(feedback.message, "Time's up! Correct answer: Paris");
    }
}
