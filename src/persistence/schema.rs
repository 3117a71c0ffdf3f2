//! `SQLite` schema bootstrap logic.
//!
//! All definitions use `IF NOT EXISTS`, so this is safe to re-run on every
//! startup.

use sqlx::SqlitePool;

use crate::Result;

/// Apply the ledger table definition to the connected `SQLite` database.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS sent_reply (
    message_id      TEXT PRIMARY KEY NOT NULL,
    thread_id       TEXT NOT NULL,
    recipient       TEXT NOT NULL,
    sent_at         TEXT NOT NULL,
    marked_at       TEXT
);

CREATE INDEX IF NOT EXISTS idx_sent_reply_thread ON sent_reply(thread_id);
CREATE INDEX IF NOT EXISTS idx_sent_reply_marked ON sent_reply(marked_at);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
