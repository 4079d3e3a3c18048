//! OAuth2 access-token cache: refresh-token grant against the Zoho accounts
//! endpoint, refreshed lazily on demand.

use crate::config::ZohoConfig;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const DEFAULT_TOKEN_URL: &str = "https://accounts.zoho.com/oauth/v2/token";

/// Tokens are treated as expired this long before the server says so, to avoid
/// sending a credential that lapses mid-flight.
const EXPIRY_SAFETY_MARGIN_SECS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token exchange request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("token exchange rejected: {0}")]
    Exchange(String),
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Owns the single cached bearer credential for the Desk API.
///
/// `access_token` returns the cached token while it is inside its validity
/// window and performs a refresh-token exchange otherwise. Concurrent callers
/// may race into a duplicate exchange; each success fully replaces the cache,
/// so the race costs at most one extra network call. A failed exchange leaves
/// the cache untouched and the next caller retries.
pub struct TokenManager {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    token_url: String,
    client: reqwest::Client,
    cached: RwLock<Option<CachedToken>>,
}

impl TokenManager {
    /// `token_url` overrides the accounts endpoint (for tests or other Zoho DCs).
    pub fn new(zoho: &ZohoConfig, token_url: Option<String>) -> Self {
        let token_url = token_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string());
        Self {
            client_id: zoho.client_id.clone().unwrap_or_default(),
            client_secret: zoho.client_secret.clone().unwrap_or_default(),
            refresh_token: zoho.refresh_token.clone().unwrap_or_default(),
            token_url,
            client: reqwest::Client::new(),
            cached: RwLock::new(None),
        }
    }

    /// Return a valid access token, refreshing it first if needed.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        if let Some(cached) = self.cached.read().await.as_ref() {
            if cached.is_valid() {
                return Ok(cached.access_token.clone());
            }
        }
        let fresh = self.exchange().await?;
        let token = fresh.access_token.clone();
        *self.cached.write().await = Some(fresh);
        Ok(token)
    }

    /// POST the refresh-token grant. Error text carries the status and body,
    /// never the refresh token or client secret.
    async fn exchange(&self) -> Result<CachedToken, AuthError> {
        let params = [
            ("refresh_token", self.refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ];
        let res = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(AuthError::Exchange(format!("{} {}", status, body)));
        }
        let data: TokenResponse = res.json().await?;
        let lifetime = data.expires_in.saturating_sub(EXPIRY_SAFETY_MARGIN_SECS);
        Ok(CachedToken {
            access_token: data.access_token,
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        })
    }
}
