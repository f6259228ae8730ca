// src/models/question.rs

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Separator between options in the question source's `options` column.
pub const OPTION_SEPARATOR: char = ';';

/// One row of the question source, exactly as it appears in the CSV file.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionRow {
    pub question: String,
    /// Options joined with `;`.
    pub options: String,
    pub answer: String,
}

/// A loaded quiz question. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = validate_answer_in_options))]
pub struct Question {
    /// The text shown to the player.
    #[validate(length(min = 1, max = 1000))]
    pub prompt: String,

    /// Ordered list of choices (e.g., ["Paris", "Rome"]).
    #[validate(length(min = 2), custom(function = validate_options))]
    pub options: Vec<String>,

    /// The correct option, always one of `options`.
    pub answer: String,
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        Question {
            prompt: row.question.trim().to_string(),
            options: row
                .options
                .split(OPTION_SEPARATOR)
                .map(|opt| opt.trim().to_string())
                .collect(),
            answer: row.answer.trim().to_string(),
        }
    }
}

impl Question {
    pub fn is_correct(&self, selected: Option<&str>) -> bool {
        selected == Some(self.answer.as_str())
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|opt| opt == option)
    }
}

fn validate_options(options: &[String]) -> Result<(), ValidationError> {
    for opt in options {
        if opt.is_empty() {
            return Err(ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

fn validate_answer_in_options(question: &Question) -> Result<(), ValidationError> {
    if question.has_option(&question.answer) {
        Ok(())
    } else {
        Err(ValidationError::new("answer_not_in_options"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(options: &str, answer: &str) -> QuestionRow {
        QuestionRow {
            question: " Capital of France? ".to_string(),
            options: options.to_string(),
            answer: answer.to_string(),
        }
    }

    #[test]
    fn options_are_split_and_trimmed() {
        let q = Question::from(row("Paris; Rome ;Berlin", " Paris"));
        assert_eq!(q.prompt, "Capital of France?");
        assert_eq!(q.options, vec!["Paris", "Rome", "Berlin"]);
        assert_eq!(q.answer, "Paris");
        assert!(q.validate().is_ok());
    }

    #[test]
    fn answer_outside_options_fails_validation() {
        let q = Question::from(row("Paris;Rome", "Madrid"));
        assert!(q.validate().is_err());
    }

    #[test]
    fn single_option_fails_validation() {
        let q = Question::from(row("Paris", "Paris"));
        assert!(q.validate().is_err());
    }

    #[test]
    fn empty_option_fails_validation() {
        let q = Question::from(row("Paris;;Rome", "Paris"));
        assert!(q.validate().is_err());
    }

    #[test]
    fn unanswered_is_never_correct() {
        let q = Question::from(row("Paris;Rome", "Paris"));
        assert!(q.is_correct(Some("Paris")));
        assert!(!q.is_correct(Some("Rome")));
        assert!(!q.is_correct(None));
    }
}
