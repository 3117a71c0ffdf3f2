//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Credential loading or OAuth token exchange failure.
    Auth(String),
    /// Gmail API transport or non-success response.
    Gmail(String),
    /// The mail store rejected a create because the resource already exists (HTTP 409).
    Conflict(String),
    /// Requested entity does not exist.
    NotFound(String),
    /// A message header could not be parsed into the shape a reply needs.
    MalformedHeader(String),
    /// Persistence failure when interacting with `SQLite`.
    Db(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Auth(msg) => write!(f, "auth: {msg}"),
            Self::Gmail(msg) => write!(f, "gmail: {msg}"),
            Self::Conflict(msg) => write!(f, "conflict: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::MalformedHeader(msg) => write!(f, "malformed header: {msg}"),
            Self::Db(msg) => write!(f, "db: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::Gmail(format!("request failed: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("invalid json: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
