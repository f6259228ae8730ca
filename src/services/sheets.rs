// src/services/sheets.rs

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::EncodingKey;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use url::Url;

use crate::{
    config::SheetsConfig,
    error::AppError,
    models::attempt::AttemptRecord,
    services::score_store::ScoreStore,
    utils::jwt::{ServiceAccountKey, sign_assertion},
};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets/";

/// Tokens are refreshed this long before Google says they expire.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: i64,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Score store backed by a Google spreadsheet, authenticated as a service account.
pub struct SheetsStore {
    client: Client,
    api_base: Url,
    spreadsheet_id: String,
    range: String,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    token: Mutex<Option<CachedToken>>,
}

impl SheetsStore {
    pub fn new(config: &SheetsConfig) -> Result<Self, AppError> {
        Self::with_api_base(config, SHEETS_API_BASE)
    }

    /// Same as [`SheetsStore::new`] against a different Sheets API root,
    /// e.g. a local stand-in.
    pub fn with_api_base(config: &SheetsConfig, api_base: &str) -> Result<Self, AppError> {
        let key = ServiceAccountKey::from_json(&config.credentials_json)?;
        let encoding_key = key.encoding_key()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        let api_base = Url::parse(api_base)
            .map_err(|e| AppError::Configuration(format!("invalid Sheets API URL: {}", e)))?;

        Ok(SheetsStore {
            client,
            api_base,
            spreadsheet_id: config.spreadsheet_id.clone(),
            range: config.range.clone(),
            key,
            encoding_key,
            token: Mutex::new(None),
        })
    }

    /// Returns a cached bearer token, exchanging a fresh assertion when needed.
    async fn access_token(&self) -> Result<String, AppError> {
        let mut cached = self.token.lock().await;
        let now = Utc::now().timestamp();

        if let Some(token) = cached.as_ref() {
            if token.expires_at - TOKEN_EXPIRY_MARGIN_SECS > now {
                return Ok(token.value.clone());
            }
        }

        let assertion = sign_assertion(&self.key, &self.encoding_key, now)?;

        let response: TokenResponse = self
            .client
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::InternalServerError(format!("token exchange failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::InternalServerError(format!("bad token response: {}", e)))?;

        tracing::debug!("Obtained Sheets access token valid for {}s", response.expires_in);

        *cached = Some(CachedToken {
            value: response.access_token.clone(),
            expires_at: now + response.expires_in,
        });
        Ok(response.access_token)
    }

    fn values_url(&self, suffix: &str) -> Result<Url, AppError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::InternalServerError("Sheets API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(&self.spreadsheet_id)
            .push("values")
            .push(&format!("{}{}", self.range, suffix));
        Ok(url)
    }
}

#[async_trait]
impl ScoreStore for SheetsStore {
    async fn append(&self, record: &AttemptRecord) -> Result<(), AppError> {
        let mut url = self.values_url(":append")?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let token = self
            .access_token()
            .await
            .map_err(|e| AppError::StoreWrite(e.to_string()))?;

        let body = json!({
            "values": [[record.name, record.score, record.total, record.percentage]],
        });

        self.client
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::StoreWrite(e.to_string()))?;

        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<AttemptRecord>, AppError> {
        let mut url = self.values_url("")?;
        url.query_pairs_mut()
            .append_pair("valueRenderOption", "UNFORMATTED_VALUE");

        let token = self
            .access_token()
            .await
            .map_err(|e| AppError::StoreRead(e.to_string()))?;

        let range: ValueRange = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::StoreRead(e.to_string()))?
            .json()
            .await
            .map_err(|e| AppError::StoreRead(e.to_string()))?;

        parse_records(&range.values)
    }
}

/// Turns a sheet's rows into records, using the first row as the header.
///
/// Rows with a blank name are skipped. Numeric cells may arrive as numbers
/// or as numeric strings depending on how the sheet was edited. Score and
/// Total must be whole, non-negative counts.
pub fn parse_records(rows: &[Vec<Value>]) -> Result<Vec<AttemptRecord>, AppError> {
    let Some((header, body)) = rows.split_first() else {
        return Ok(Vec::new());
    };

    let columns: HashMap<String, usize> = header
        .iter()
        .enumerate()
        .filter_map(|(i, cell)| cell.as_str().map(|name| (name.trim().to_string(), i)))
        .collect();

    let column = |name: &str| {
        columns
            .get(name)
            .copied()
            .ok_or_else(|| AppError::StoreRead(format!("sheet has no '{}' column", name)))
    };
    let name_col = column("Name")?;
    let score_col = column("Score")?;
    let total_col = column("Total")?;
    let pct_col = column("Percentage")?;

    let mut records = Vec::with_capacity(body.len());
    for (i, row) in body.iter().enumerate() {
        let name = match row.get(name_col) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        if name.is_empty() {
            continue;
        }

        // Sheet rows are 1-based and the header takes the first one.
        let line = i + 2;
        let bad_cell = |col: &str| AppError::StoreRead(format!("row {}: bad {} cell", line, col));

        records.push(AttemptRecord {
            name,
            score: cell_count(row.get(score_col)).ok_or_else(|| bad_cell("Score"))?,
            total: cell_count(row.get(total_col)).ok_or_else(|| bad_cell("Total"))?,
            percentage: cell_number(row.get(pct_col))
                .filter(|pct| pct.is_finite())
                .ok_or_else(|| bad_cell("Percentage"))?,
        });
    }

    Ok(records)
}

fn cell_number(cell: Option<&Value>) -> Option<f64> {
    match cell? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    }
}

/// A cell holding a count: finite, whole and within `u32`.
fn cell_count(cell: Option<&Value>) -> Option<u32> {
    let n = cell_number(cell)?;
    if n.is_finite() && n.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&n) {
        Some(n as u32)
    } else {
        None
    }
}
