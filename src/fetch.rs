//! HTTP and token collaborators used by the readers.
//!
//! Readers depend on the [`HttpFetch`] and [`TokenProvider`] traits rather than
//! on `reqwest` directly, so tests can substitute canned responses. The
//! production implementations are [`ReqwestFetch`], [`StaticToken`] and
//! [`RefreshTokenProvider`].

use std::future::Future;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;

// ---

/// Capability to GET a JSON document.
pub trait HttpFetch: Send + Sync {
    /// Fetch `url`, sending `bearer` as an `Authorization` token when given.
    fn get_json(
        &self,
        url: &str,
        bearer: Option<&str>,
    ) -> impl Future<Output = Result<Value>> + Send;
}

/// Capability to hand out a current OAuth access token.
pub trait TokenProvider: Send + Sync {
    fn access_token(&self) -> impl Future<Output = Result<String>> + Send;
}

// ---

/// [`HttpFetch`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    // ---
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpFetch for ReqwestFetch {
    // ---
    async fn get_json(&self, url: &str, bearer: Option<&str>) -> Result<Value> {
        // ---
        let mut request = self.client.get(url);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        tracing::debug!("GET {}", url);
        let response = request
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("{url} returned an error status"))?;

        let body: Value = response
            .json()
            .await
            .with_context(|| format!("{url} returned invalid JSON"))?;
        Ok(body)
    }
}

/// Build the shared HTTP client with the configured `User-Agent`.
pub fn build_client(user_agent: &str) -> Result<reqwest::Client> {
    // ---
    reqwest::Client::builder()
        .user_agent(user_agent)
        .build()
        .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))
}

// ---

/// A fixed access token, e.g. one minted out of band.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Upper bound on a cached token's lifetime, whatever the endpoint claims.
const MAX_TOKEN_LIFETIME_SECS: i64 = 24 * 3600;

/// Refresh one minute ahead of expiry.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: DateTime<Utc>,
}

/// When a token issued at `now` with `expires_in` should be replaced.
///
/// The lifetime is clamped to `[0, MAX_TOKEN_LIFETIME_SECS]`; a deadline that
/// cannot be represented falls back to `now`, so the next call re-exchanges.
fn refresh_deadline(now: DateTime<Utc>, expires_in: Option<i64>) -> DateTime<Utc> {
    // ---
    let lifetime = expires_in
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)
        .clamp(0, MAX_TOKEN_LIFETIME_SECS);
    TimeDelta::try_seconds(lifetime - REFRESH_MARGIN_SECS)
        .and_then(|ahead| now.checked_add_signed(ahead))
        .unwrap_or(now)
}

/// Access tokens minted from a long-lived refresh token.
///
/// The token is cached and reused until a minute before it expires.
#[derive(Debug)]
pub struct RefreshTokenProvider {
    // ---
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    cached: Mutex<Option<CachedToken>>,
}

impl RefreshTokenProvider {
    // ---
    pub fn new(
        client: reqwest::Client,
        token_url: String,
        client_id: String,
        client_secret: String,
        refresh_token: String,
    ) -> Self {
        Self {
            client,
            token_url,
            client_id,
            client_secret,
            refresh_token,
            cached: Mutex::new(None),
        }
    }

    async fn exchange(&self) -> Result<TokenResponse> {
        // ---
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", self.refresh_token.as_str()),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .context("token request failed")?
            .error_for_status()
            .context("token endpoint rejected the refresh token")?;

        response
            .json::<TokenResponse>()
            .await
            .context("token endpoint returned an unexpected body")
    }
}

impl TokenProvider for RefreshTokenProvider {
    // ---
    async fn access_token(&self) -> Result<String> {
        // ---
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Utc::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.exchange().await?;
        let refresh_at = refresh_deadline(Utc::now(), fresh.expires_in);
        tracing::info!("Obtained access token, refreshing after {}", refresh_at);

        let token = CachedToken {
            value: fresh.access_token,
            refresh_at,
        };
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }
}

/// Token provider selected from configuration.
#[derive(Debug)]
pub enum ConfiguredToken {
    Static(StaticToken),
    Refresh(RefreshTokenProvider),
}

impl TokenProvider for ConfiguredToken {
    async fn access_token(&self) -> Result<String> {
        match self {
            Self::Static(t) => t.access_token().await,
            Self::Refresh(t) => t.access_token().await,
        }
    }
}

// ---
