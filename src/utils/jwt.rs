// src/utils/jwt.rs

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// OAuth scope needed to append to and read a spreadsheet.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Lifetime requested for each assertion. Google caps this at one hour.
pub const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// The subset of a Google service-account key file that signing needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        serde_json::from_str(raw)
            .map_err(|e| AppError::Configuration(format!("invalid service account JSON: {}", e)))
    }

    pub fn encoding_key(&self) -> Result<EncodingKey, AppError> {
        EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| AppError::Configuration(format!("invalid service account key: {}", e)))
    }
}

/// JWT Claims for the OAuth 2.0 JWT-bearer grant.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AssertionClaims {
    /// Issuer - the service account email.
    pub iss: String,
    pub scope: String,
    /// Audience - the token endpoint.
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs an RS256 assertion that can be exchanged for an access token.
///
/// Arguments:
/// * `key`: Parsed service-account key.
/// * `encoding_key`: RSA key derived from `key.private_key`.
/// * `issued_at`: Unix timestamp (seconds).
pub fn sign_assertion(
    key: &ServiceAccountKey,
    encoding_key: &EncodingKey,
    issued_at: i64,
) -> Result<String, AppError> {
    let claims = AssertionClaims {
        iss: key.client_email.clone(),
        scope: SHEETS_SCOPE.to_string(),
        aud: key.token_uri.clone(),
        iat: issued_at,
        exp: issued_at + ASSERTION_LIFETIME_SECS,
    };

    encode(&Header::new(Algorithm::RS256), &claims, encoding_key)
        .map_err(|e| AppError::InternalServerError(format!("failed to sign assertion: {}", e)))
}
