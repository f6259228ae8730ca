// src/config.rs

use std::{env, net::SocketAddr, path::PathBuf, str::FromStr};

use dotenvy::dotenv;

use crate::error::AppError;

/// Which backend persists attempt records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Shared Google spreadsheet.
    Sheets,
    /// Local append-only CSV file.
    Csv,
    /// Process memory, lost on restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sheets" => Ok(StoreBackend::Sheets),
            "csv" => Ok(StoreBackend::Csv),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(AppError::Configuration(format!(
                "SCORE_STORE must be one of sheets, csv, memory (got '{}')",
                other
            ))),
        }
    }
}

/// Google Sheets access. The credential is the service-account JSON document.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub range: String,
    pub credentials_json: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub questions_path: PathBuf,
    pub question_time_limit_secs: i64,
    pub timer_warning_secs: i64,
    pub refresh_interval_ms: u64,
    pub store_backend: StoreBackend,
    pub scores_csv_path: PathBuf,
    pub sheets: Option<SheetsConfig>,
    /// Browser origins allowed to call the API.
    pub cors_origins: Vec<String>,
    /// Sessions untouched for this long are dropped.
    pub session_idle_secs: u64,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            questions_path: PathBuf::from("questions.csv"),
            question_time_limit_secs: 15,
            timer_warning_secs: 5,
            refresh_interval_ms: 5000,
            store_backend: StoreBackend::Csv,
            scores_csv_path: PathBuf::from("scores.csv"),
            sheets: None,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            session_idle_secs: 1800,
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let defaults = Config::default();

        let bind_addr = parse_var("BIND_ADDR", defaults.bind_addr)?;

        let questions_path = env::var("QUESTIONS_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.questions_path);

        let question_time_limit_secs: i64 =
            parse_var("QUESTION_TIME_LIMIT_SECS", defaults.question_time_limit_secs)?;
        if question_time_limit_secs <= 0 {
            return Err(AppError::Configuration(
                "QUESTION_TIME_LIMIT_SECS must be positive".to_string(),
            ));
        }

        let timer_warning_secs = parse_var("TIMER_WARNING_SECS", defaults.timer_warning_secs)?;
        let refresh_interval_ms = parse_var("REFRESH_INTERVAL_MS", defaults.refresh_interval_ms)?;
        let store_backend = parse_var("SCORE_STORE", defaults.store_backend)?;

        let scores_csv_path = env::var("SCORES_CSV_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.scores_csv_path);

        let sheets = if store_backend == StoreBackend::Sheets {
            let spreadsheet_id = env::var("GOOGLE_SPREADSHEET_ID").map_err(|_| {
                AppError::Configuration("GOOGLE_SPREADSHEET_ID must be set".to_string())
            })?;
            let credentials_json = env::var("GOOGLE_CREDENTIALS").map_err(|_| {
                AppError::Configuration("GOOGLE_CREDENTIALS must be set".to_string())
            })?;
            let range = env::var("GOOGLE_SHEET_RANGE").unwrap_or_else(|_| "Sheet1".to_string());

            Some(SheetsConfig {
                spreadsheet_id,
                range,
                credentials_json,
            })
        } else {
            None
        };

        let cors_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or(defaults.cors_origins);

        let session_idle_secs = parse_var("SESSION_IDLE_SECS", defaults.session_idle_secs)?;
        if session_idle_secs == 0 {
            return Err(AppError::Configuration(
                "SESSION_IDLE_SECS must be positive".to_string(),
            ));
        }

        let rust_log = env::var("RUST_LOG").unwrap_or(defaults.rust_log);

        Ok(Self {
            bind_addr,
            questions_path,
            question_time_limit_secs,
            timer_warning_secs,
            refresh_interval_ms,
            store_backend,
            scores_csv_path,
            sheets,
            cors_origins,
            session_idle_secs,
            rust_log,
        })
    }
}

/// Comma-separated origins, blanks dropped.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_var<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Configuration(format!("{} is invalid: {}", name, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_backend_parses_case_insensitively() {
        assert_eq!("Sheets".parse::<StoreBackend>().unwrap(), StoreBackend::Sheets);
        assert_eq!(" csv ".parse::<StoreBackend>().unwrap(), StoreBackend::Csv);
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("postgres".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn origins_are_split_and_trimmed() {
        assert_eq!(
            parse_origins(" https://quiz.example.com, ,http://localhost:8080 "),
            vec!["https://quiz.example.com", "http://localhost:8080"]
        );
    }

    #[test]
    fn defaults_match_quiz_rules() {
        let config = Config::default();
        assert_eq!(config.question_time_limit_secs, 15);
        assert_eq!(config.timer_warning_secs, 5);
        assert_eq!(config.refresh_interval_ms, 5000);
    }
}
