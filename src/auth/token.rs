//! OAuth 2.0 refresh-token exchange with an in-process access-token cache.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::TokenProvider;
use crate::config::AuthConfig;
use crate::{AppError, Result};

/// Scopes the responder needs: read, send, label management, full access.
pub const REQUIRED_SCOPES: [&str; 4] = [
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/gmail.send",
    "https://www.googleapis.com/auth/gmail.labels",
    "https://mail.google.com/",
];

/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Assumed lifetime when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Return the required scopes absent from a space-separated `granted` list.
#[must_use]
pub fn missing_scopes(granted: &str) -> Vec<&'static str> {
    REQUIRED_SCOPES
        .iter()
        .copied()
        .filter(|scope| !granted.split_whitespace().any(|g| g == *scope))
        .collect()
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    scope: Option<String>,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Exchanges a refresh token for access tokens and caches them until
/// shortly before expiry.
pub struct OAuthTokenProvider {
    http: Client,
    token_uri: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    cached: Mutex<Option<CachedToken>>,
}

impl OAuthTokenProvider {
    /// Build a provider from loaded credentials.
    #[must_use]
    pub fn new(http: Client, auth: &AuthConfig) -> Self {
        Self {
            http,
            token_uri: auth.token_uri.clone(),
            client_id: auth.client_id.clone(),
            client_secret: auth.client_secret.clone(),
            refresh_token: auth.refresh_token.clone(),
            cached: Mutex::new(None),
        }
    }

    async fn refresh(&self) -> Result<TokenResponse> {
        let response = self
            .http
            .post(&self.token_uri)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", self.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|err| AppError::Auth(format!("failed to refresh token: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Auth(format!(
                "token refresh failed ({status}): {body}"
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|err| AppError::Auth(format!("failed to parse token response: {err}")))
    }

    async fn token(&self) -> Result<String> {
        let mut guard = self.cached.lock().await;

        if let Some(cached) = guard.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.value.clone());
            }
            debug!("access token near expiry, refreshing");
        }

        let response = self.refresh().await?;

        if let Some(scope) = response.scope.as_deref() {
            let missing = missing_scopes(scope);
            if !missing.is_empty() {
                warn!(?missing, "access token lacks required scopes");
            }
        }

        let lifetime = response
            .expires_in
            .map_or(DEFAULT_TOKEN_LIFETIME, Duration::from_secs);
        let refresh_at = Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN);
        info!(expires_in = lifetime.as_secs(), "access token refreshed");

        let value = response.access_token;
        *guard = Some(CachedToken {
            value: value.clone(),
            refresh_at,
        });
        Ok(value)
    }
}

impl TokenProvider for OAuthTokenProvider {
    fn access_token(&self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        Box::pin(self.token())
    }
}

/// Provider returning a fixed token, for pre-minted tokens and tests.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Wrap an already-issued access token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn access_token(&self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        let token = self.token.clone();
        Box::pin(async move { Ok(token) })
    }
}
