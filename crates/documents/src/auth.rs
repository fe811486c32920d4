//! Service-account authentication for Google APIs.
//!
//! Signs an RS256 JWT assertion with the account's private key and exchanges
//! it for a short-lived bearer token. The token is reused until shortly
//! before it expires.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use textpilot_core::error::DocumentError;
use tokio::sync::Mutex;
use tracing::debug;

/// Read access to docs and drive, read/write to sheets.
pub const SCOPES: &str = "https://www.googleapis.com/auth/documents.readonly \
https://www.googleapis.com/auth/drive.readonly \
https://www.googleapis.com/auth/spreadsheets";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// The fields we need from a service-account JSON key.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.into()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Decode the base64-wrapped JSON key stored in configuration.
    pub fn from_base64(encoded: &str) -> Result<Self, DocumentError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| DocumentError::Auth(format!("service account is not valid base64: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| DocumentError::Auth(format!("service account JSON is invalid: {e}")))
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Hands out bearer tokens for one service account.
pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(key: ServiceAccountKey, client: reqwest::Client) -> Self {
        Self {
            key,
            client,
            cached: Mutex::new(None),
        }
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Build the signed JWT assertion for the token exchange.
    pub fn assertion(&self, issued_at: i64) -> Result<String, DocumentError> {
        let claims = Claims {
            iss: &self.key.client_email,
            scope: SCOPES,
            aud: &self.key.token_uri,
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| DocumentError::Auth(format!("invalid private key: {e}")))?;
        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| DocumentError::Auth(format!("failed to sign assertion: {e}")))
    }

    /// A valid bearer token, fetching a new one when the cached one is stale.
    pub async fn token(&self) -> Result<String, DocumentError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && token.expires_at > Instant::now()
        {
            return Ok(token.value.clone());
        }

        debug!(account = %self.key.client_email, "Requesting access token");
        let assertion = self.assertion(chrono::Utc::now().timestamp())?;
        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| DocumentError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DocumentError::Auth(format!("token exchange failed ({status}): {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| DocumentError::Auth(format!("unreadable token response: {e}")))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }
}
