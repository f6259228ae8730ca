// src/services/question_bank.rs

use std::{
    fs::File,
    io::Read,
    path::PathBuf,
    sync::{Arc, OnceLock},
};

use validator::Validate;

use crate::{
    error::AppError,
    models::question::{Question, QuestionRow},
};

/// Fixed list of questions read from a CSV file with the columns
/// `question`, `options` and `answer`.
///
/// The file is read at most once; later calls hand out the same `Arc`.
#[derive(Debug)]
pub struct QuestionBank {
    path: PathBuf,
    cache: OnceLock<Arc<[Question]>>,
}

impl QuestionBank {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        QuestionBank {
            path: path.into(),
            cache: OnceLock::new(),
        }
    }

    /// Returns the cached questions, reading the file on first use.
    pub fn load_questions(&self) -> Result<Arc<[Question]>, AppError> {
        if let Some(questions) = self.cache.get() {
            return Ok(Arc::clone(questions));
        }

        let file = File::open(&self.path).map_err(|e| {
            AppError::DataLoad(format!("cannot open {}: {}", self.path.display(), e))
        })?;
        let questions: Arc<[Question]> = parse_questions(file)?.into();

        tracing::info!(
            "Loaded {} questions from {}",
            questions.len(),
            self.path.display()
        );

        // A concurrent first load may have won; either way the cell holds one value.
        let cached = self.cache.get_or_init(|| questions);
        Ok(Arc::clone(cached))
    }
}

/// Parses and validates a whole question source. Any bad row fails the load.
pub fn parse_questions<R: Read>(reader: R) -> Result<Vec<Question>, AppError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(reader);

    let mut questions = Vec::new();
    for (i, row) in csv_reader.deserialize::<QuestionRow>().enumerate() {
        // Header is line 1, so data row i sits on line i + 2.
        let line = i + 2;
        let row = row.map_err(|e| AppError::DataLoad(format!("line {}: {}", line, e)))?;
        let question = Question::from(row);
        question
            .validate()
            .map_err(|e| AppError::DataLoad(format!("line {}: {}", line, e)))?;
        questions.push(question);
    }

    if questions.is_empty() {
        return Err(AppError::DataLoad("question source has no rows".to_string()));
    }

    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "question,options,answer\n\
        Capital of France?,Paris;Rome;Berlin,Paris\n\
        Largest ocean?,Atlantic;Pacific,Pacific\n";

    fn temp_csv(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("questions-{}.csv", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn parses_rows_in_order() {
        let questions = parse_questions(SAMPLE.as_bytes()).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].prompt, "Capital of France?");
        assert_eq!(questions[1].options, vec!["Atlantic", "Pacific"]);
    }

    #[test]
    fn answer_not_in_options_reports_line() {
        let csv = "question,options,answer\nQ1,A;B,A\nQ2,A;B,C\n";
        let err = parse_questions(csv.as_bytes()).unwrap_err();
        match err {
            AppError::DataLoad(msg) => assert!(msg.contains("line 3"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn missing_column_is_a_load_error() {
        let csv = "question,answer\nQ1,A\n";
        assert!(matches!(
            parse_questions(csv.as_bytes()),
            Err(AppError::DataLoad(_))
        ));
    }

    #[test]
    fn empty_source_is_a_load_error() {
        let csv = "question,options,answer\n";
        assert!(matches!(
            parse_questions(csv.as_bytes()),
            Err(AppError::DataLoad(_))
        ));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let bank = QuestionBank::new("/definitely/not/here.csv");
        assert!(matches!(bank.load_questions(), Err(AppError::DataLoad(_))));
    }

    #[test]
    fn repeated_loads_return_the_cached_sequence() {
        let path = temp_csv(SAMPLE);
        let bank = QuestionBank::new(&path);

        let first = bank.load_questions().unwrap();
        // The source is not read again, even if it disappears.
        std::fs::remove_file(&path).unwrap();
        let second = bank.load_questions().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 2);
    }
}
