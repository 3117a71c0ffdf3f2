//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// Keychain service name under which OAuth credentials are stored.
pub const KEYRING_SERVICE: &str = "vacation-responder";

/// Google's OAuth 2.0 token endpoint.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Marker label settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LabelConfig {
    /// Name of the label applied to every handled thread.
    pub name: String,
    /// Visibility of the label in the label list.
    #[serde(default = "default_label_list_visibility")]
    pub label_list_visibility: String,
    /// Visibility of messages carrying the label in the message list.
    #[serde(default = "default_message_list_visibility")]
    pub message_list_visibility: String,
}

fn default_label_list_visibility() -> String {
    "labelShow".into()
}

fn default_message_list_visibility() -> String {
    "show".into()
}

/// Bounds of the randomized delay between polling cycles (seconds, inclusive).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ScheduleConfig {
    /// Shortest permitted delay.
    #[serde(default = "default_min_delay")]
    pub min_delay_seconds: u64,
    /// Longest permitted delay.
    #[serde(default = "default_max_delay")]
    pub max_delay_seconds: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            min_delay_seconds: default_min_delay(),
            max_delay_seconds: default_max_delay(),
        }
    }
}

fn default_min_delay() -> u64 {
    45
}

fn default_max_delay() -> u64 {
    120
}

/// Auto-reply content.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ReplyConfig {
    /// Plain-text body sent in every auto-reply.
    pub body: String,
    /// Optional `From` header; Gmail fills in the account address when absent.
    #[serde(default)]
    pub from: Option<String>,
}

/// OAuth credential source and HTTP client settings.
///
/// Secrets are loaded at runtime from the credentials file, the OS keychain,
/// or environment variables, never from the TOML config file itself.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AuthConfig {
    /// Authorized-user JSON file holding the refresh token.
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,
    /// Per-request timeout applied to every Gmail and token call.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// OAuth client id (populated at runtime).
    #[serde(skip)]
    pub client_id: String,
    /// OAuth client secret (populated at runtime).
    #[serde(skip)]
    pub client_secret: String,
    /// Long-lived refresh token (populated at runtime).
    #[serde(skip)]
    pub refresh_token: String,
    /// Token endpoint used for refresh (populated at runtime).
    #[serde(skip)]
    pub token_uri: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credentials_file: None,
            request_timeout_seconds: default_request_timeout(),
            client_id: String::new(),
            client_secret: String::new(),
            refresh_token: String::new(),
            token_uri: DEFAULT_TOKEN_URI.into(),
        }
    }
}

fn default_request_timeout() -> u64 {
    30
}

fn default_http_port() -> u16 {
    1570
}

fn default_user_id() -> String {
    "me".into()
}

fn default_api_base() -> String {
    "https://gmail.googleapis.com/gmail/v1".into()
}

fn default_retention_days() -> u32 {
    30
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Port the trigger/health HTTP listener binds on `127.0.0.1`.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Gmail user id; `me` addresses the authenticated account.
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// Base URL of the Gmail REST API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Start the responder loop at boot instead of waiting for `GET /`.
    #[serde(default)]
    pub autostart: bool,
    /// `SQLite` file backing the sent-reply ledger; in-memory when absent.
    #[serde(default)]
    pub ledger_path: Option<PathBuf>,
    /// Days after marking before ledger rows are purged.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Marker label settings.
    pub label: LabelConfig,
    /// Inter-cycle delay bounds.
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Auto-reply content.
    pub reply: ReplyConfig,
    /// Credential source and HTTP client settings.
    #[serde(default)]
    pub auth: AuthConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load OAuth credentials into `self.auth`.
    ///
    /// Reads the authorized-user JSON file when `auth.credentials_file` is
    /// set. Otherwise each value is read from the `vacation-responder`
    /// keyring service, falling back to `GMAIL_CLIENT_ID`,
    /// `GMAIL_CLIENT_SECRET` and `GMAIL_REFRESH_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Auth` if the file is unreadable or incomplete, or
    /// if neither keychain nor env vars provide a required value.
    pub async fn load_credentials(&mut self) -> Result<()> {
        if let Some(path) = self.auth.credentials_file.clone() {
            let file = AuthorizedUserFile::load(&path)?;
            self.auth.client_id = file.client_id;
            self.auth.client_secret = file.client_secret;
            self.auth.refresh_token = file.refresh_token;
            self.auth.token_uri = file.token_uri.unwrap_or_else(|| DEFAULT_TOKEN_URI.into());
            return Ok(());
        }

        self.auth.client_id = load_credential("client_id", "GMAIL_CLIENT_ID").await?;
        self.auth.client_secret = load_credential("client_secret", "GMAIL_CLIENT_SECRET").await?;
        self.auth.refresh_token = load_credential("refresh_token", "GMAIL_REFRESH_TOKEN").await?;
        if self.auth.token_uri.is_empty() {
            self.auth.token_uri = DEFAULT_TOKEN_URI.into();
        }
        Ok(())
    }

    /// Per-request timeout for outbound HTTP calls.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.auth.request_timeout_seconds)
    }

    fn validate(&mut self) -> Result<()> {
        if self.label.name.trim().is_empty() {
            return Err(AppError::Config("label.name must not be empty".into()));
        }

        if self.reply.body.trim().is_empty() {
            return Err(AppError::Config("reply.body must not be empty".into()));
        }

        if self.schedule.min_delay_seconds == 0 {
            return Err(AppError::Config(
                "schedule.min_delay_seconds must be greater than zero".into(),
            ));
        }

        if self.schedule.min_delay_seconds > self.schedule.max_delay_seconds {
            return Err(AppError::Config(format!(
                "schedule.min_delay_seconds ({}) exceeds max_delay_seconds ({})",
                self.schedule.min_delay_seconds, self.schedule.max_delay_seconds
            )));
        }

        if self.auth.request_timeout_seconds == 0 {
            return Err(AppError::Config(
                "auth.request_timeout_seconds must be greater than zero".into(),
            ));
        }

        if self.auth.token_uri.is_empty() {
            self.auth.token_uri = DEFAULT_TOKEN_URI.into();
        }

        self.api_base = self.api_base.trim_end_matches('/').to_owned();
        Ok(())
    }
}

/// Google "authorized user" credential file as written by the consent flow.
#[derive(Debug, Deserialize)]
struct AuthorizedUserFile {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    #[serde(default)]
    token_uri: Option<String>,
}

impl AuthorizedUserFile {
    fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            AppError::Auth(format!(
                "failed to read credentials file {}: {err}",
                path.display()
            ))
        })?;
        let file: Self = serde_json::from_str(&raw)
            .map_err(|err| AppError::Auth(format!("invalid credentials file: {err}")))?;
        if file.refresh_token.is_empty() {
            return Err(AppError::Auth(
                "credentials file has an empty refresh_token".into(),
            ));
        }
        Ok(file)
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Auth(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    match env::var(env_key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(AppError::Auth(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))),
    }
}
