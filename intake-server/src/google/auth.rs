//! Service-account access tokens
//!
//! Signs an RS256 JWT assertion with the service account's private key and
//! exchanges it at the token endpoint (JWT bearer grant). Tokens are cached
//! and refreshed shortly before they expire.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{check_status, GoogleError};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

/// Fields of a service-account JSON key used for the token grant
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, GoogleError> {
        serde_json::from_str(json)
            .map_err(|e| GoogleError::Credentials(format!("Invalid service-account key: {}", e)))
    }

    pub async fn from_file(path: &Path) -> Result<Self, GoogleError> {
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            GoogleError::Credentials(format!("Read {} failed: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }
}

/// JWT claim set for the bearer grant
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

pub fn build_claims(key: &ServiceAccountKey, scopes: &[&str], now: DateTime<Utc>) -> Claims {
    let iat = now.timestamp();
    Claims {
        iss: key.client_email.clone(),
        scope: scopes.join(" "),
        aud: key.token_uri.clone(),
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now
    }
}

/// Shared bearer-token source for the Google clients
pub struct TokenProvider {
    http: reqwest::Client,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scopes: Vec<&'static str>,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(
        http: reqwest::Client,
        key: ServiceAccountKey,
        scopes: &[&'static str],
    ) -> Result<Self, GoogleError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| GoogleError::Credentials(format!("Invalid private key: {}", e)))?;

        info!(account = %key.client_email, "Google service account loaded");
        Ok(Self {
            http,
            key,
            encoding_key,
            scopes: scopes.to_vec(),
            cached: Mutex::new(None),
        })
    }

    /// Current access token, fetching a new one when the cache is stale
    pub async fn access_token(&self) -> Result<String, GoogleError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.fetch_token().await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }

    fn signed_assertion(&self, now: DateTime<Utc>) -> Result<String, GoogleError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();
        let claims = build_claims(&self.key, &self.scopes, now);
        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| GoogleError::Signing(e.to_string()))
    }

    async fn fetch_token(&self) -> Result<CachedToken, GoogleError> {
        let now = Utc::now();
        let assertion = self.signed_assertion(now)?;

        debug!(token_uri = %self.key.token_uri, "Requesting Google access token");
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let response = check_status("OAuth", response).await?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GoogleError::Parse(e.to_string()))?;

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}
