//! Service-account credentials and OAuth access tokens for Firestore.
//!
//! Tokens are minted with the JWT bearer grant: a self-signed RS256
//! assertion is exchanged at the key's token endpoint for an access token,
//! which is cached until shortly before it expires.

use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use firestore_store::schema::DATASTORE_SCOPE;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug)]
pub enum AuthError {
    Io { path: PathBuf, source: std::io::Error },
    InvalidKey(String),
    Signing(jsonwebtoken::errors::Error),
    Http(Box<reqwest::Error>),
    TokenExchange { status: u16, message: String },
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read credential file {}: {source}", path.display())
            }
            Self::InvalidKey(message) => write!(f, "invalid service account key: {message}"),
            Self::Signing(err) => write!(f, "failed to sign token assertion: {err}"),
            Self::Http(err) => write!(f, "token request failed: {err}"),
            Self::TokenExchange { status, message } => {
                write!(f, "token endpoint returned {status}: {message}")
            }
        }
    }
}

impl Error for AuthError {}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Signing(err)
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(Box::new(err))
    }
}

/// Parsed service-account key file.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub project_id: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Reads and validates a key file.
    ///
    /// # Errors
    /// Returns `AuthError` if the file cannot be read or is not a service-account key.
    pub async fn from_file(path: &Path) -> Result<Self, AuthError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| AuthError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(&raw)
    }

    /// Parses and validates key JSON.
    ///
    /// # Errors
    /// Returns `AuthError::InvalidKey` for malformed JSON, a wrong key type, or blank fields.
    pub fn from_json(raw: &str) -> Result<Self, AuthError> {
        let key: Self =
            serde_json::from_str(raw).map_err(|err| AuthError::InvalidKey(err.to_string()))?;
        key.validate()?;
        Ok(key)
    }

    #[must_use]
    pub fn token_uri(&self) -> &str {
        self.token_uri
            .as_deref()
            .filter(|uri| !uri.trim().is_empty())
            .unwrap_or(GOOGLE_TOKEN_URI)
    }

    fn validate(&self) -> Result<(), AuthError> {
        if self.key_type != "service_account" {
            return Err(AuthError::InvalidKey(format!(
                "expected type 'service_account', found '{}'",
                self.key_type
            )));
        }
        for (name, value) in [
            ("project_id", &self.project_id),
            ("client_email", &self.client_email),
            ("private_key", &self.private_key),
        ] {
            if value.trim().is_empty() {
                return Err(AuthError::InvalidKey(format!("{name} is required")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Expiry `expires_in` seconds after `now`, with the assertion lifetime
    /// standing in for missing or unrepresentable values.
    fn expiry(now: DateTime<Utc>, expires_in: Option<i64>) -> DateTime<Utc> {
        expires_in
            .and_then(TimeDelta::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .or_else(|| now.checked_add_signed(TimeDelta::seconds(ASSERTION_LIFETIME_SECS)))
            .unwrap_or(now)
    }

    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - TimeDelta::seconds(REFRESH_MARGIN_SECS) > now
    }
}

/// Caching source of OAuth access tokens for one service account.
pub struct TokenSource {
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    http: reqwest::Client,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenSource {
    /// Builds a token source, parsing the key's RSA private key up front.
    ///
    /// # Errors
    /// Returns `AuthError::InvalidKey` if the private key is not an RSA PEM key.
    pub fn new(key: ServiceAccountKey, http: reqwest::Client) -> Result<Self, AuthError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|err| {
            AuthError::InvalidKey(format!("private_key is not a valid RSA PEM key: {err}"))
        })?;
        Ok(Self {
            key,
            signing_key,
            http,
            cached: Mutex::new(None),
        })
    }

    /// Returns a valid access token, refreshing it when close to expiry.
    ///
    /// Concurrent callers wait for a single refresh.
    ///
    /// # Errors
    /// Returns `AuthError` if signing or the token exchange fails.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref().filter(|token| token.is_fresh(now)) {
            return Ok(token.value.clone());
        }
        let token = self.exchange(now).await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    pub(crate) fn assertion(&self, now: DateTime<Utc>) -> Result<String, AuthError> {
        let issued_at = now.timestamp();
        let claims = AssertionClaims {
            iss: self.key.client_email.clone(),
            scope: DATASTORE_SCOPE.to_string(),
            aud: self.key.token_uri().to_string(),
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&self.key.private_key_id);
        Ok(jsonwebtoken::encode(&header, &claims, &self.signing_key)?)
    }

    async fn exchange(&self, now: DateTime<Utc>) -> Result<AccessToken, AuthError> {
        debug!(client_email = %self.key.client_email, "requesting Firestore access token");
        let assertion = self.assertion(now)?;
        let response = self
            .http
            .post(self.key.token_uri())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenExchange {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }

        let token: TokenResponse = response.json().await?;
        Ok(AccessToken {
            value: token.access_token,
            expires_at: AccessToken::expiry(now, token.expires_in),
        })
    }
}
