//! `SQLite` connection bootstrap for the sent-reply ledger.

use std::fs;
use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::{AppError, Result};

use super::schema;

/// Alias for the shared `SQLite` pool.
pub type Database = SqlitePool;

/// Open (creating if needed) the ledger file at `path` and apply schema.
///
/// # Errors
///
/// Returns `AppError::Db` if the directory, connection, or schema fails.
pub async fn connect(path: &Path) -> Result<Database> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|err| AppError::Db(format!("failed to create db dir: {err}")))?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    schema::bootstrap_schema(&pool).await?;
    Ok(pool)
}

/// Open an in-memory ledger that lives as long as the returned pool.
///
/// A single never-recycled connection keeps the in-memory database alive.
///
/// # Errors
///
/// Returns `AppError::Db` if the connection or schema fails.
pub async fn connect_memory() -> Result<Database> {
    let options = SqliteConnectOptions::new().in_memory(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    schema::bootstrap_schema(&pool).await?;
    Ok(pool)
}

/// Connect to the file at `path` when given, in memory otherwise.
///
/// # Errors
///
/// Returns `AppError::Db` if the connection or schema fails.
pub async fn open(path: Option<&Path>) -> Result<Database> {
    match path {
        Some(path) => connect(path).await,
        None => connect_memory().await,
    }
}
