//! Sent-reply ledger repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::sent_reply::SentReply;
use crate::{AppError, Result};

use super::db::Database;

/// Repository for sent-reply ledger records.
#[derive(Clone)]
pub struct SentReplyRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct SentReplyRow {
    message_id: String,
    thread_id: String,
    recipient: String,
    sent_at: String,
    marked_at: Option<String>,
}

impl SentReplyRow {
    fn into_sent_reply(self) -> Result<SentReply> {
        let sent_at = parse_timestamp(&self.sent_at, "sent_at")?;
        let marked_at = self
            .marked_at
            .as_deref()
            .map(|raw| parse_timestamp(raw, "marked_at"))
            .transpose()?;

        Ok(SentReply {
            message_id: self.message_id,
            thread_id: self.thread_id,
            recipient: self.recipient,
            sent_at,
            marked_at,
        })
    }
}

/// Fixed-width UTC timestamps so string comparison matches time order.
fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Db(format!("invalid {field}: {e}")))
}

impl SentReplyRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Record that a reply was sent.
    ///
    /// Re-recording an existing message id keeps the first row.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails.
    pub async fn record_sent(&self, reply: &SentReply) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO sent_reply (message_id, thread_id, recipient, sent_at, marked_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&reply.message_id)
        .bind(&reply.thread_id)
        .bind(&reply.recipient)
        .bind(format_timestamp(reply.sent_at))
        .bind(reply.marked_at.map(format_timestamp))
        .execute(self.db.as_ref())
        .await?;
        Ok(())
    }

    /// The reply already sent into `thread_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails or the row is corrupt.
    pub async fn find_for_thread(&self, thread_id: &str) -> Result<Option<SentReply>> {
        let row: Option<SentReplyRow> = sqlx::query_as(
            "SELECT message_id, thread_id, recipient, sent_at, marked_at
             FROM sent_reply WHERE thread_id = ?1
             ORDER BY sent_at ASC LIMIT 1",
        )
        .bind(thread_id)
        .fetch_optional(self.db.as_ref())
        .await?;

        row.map(SentReplyRow::into_sent_reply).transpose()
    }

    /// Stamp the marker-applied time on the ledger rows of `thread_id`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no row exists for `thread_id`, or
    /// `AppError::Db` if the update fails.
    pub async fn record_marked(&self, thread_id: &str) -> Result<()> {
        let result = sqlx::query("UPDATE sent_reply SET marked_at = ?1 WHERE thread_id = ?2")
            .bind(format_timestamp(Utc::now()))
            .bind(thread_id)
            .execute(self.db.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "no sent reply recorded for thread {thread_id}"
            )));
        }
        Ok(())
    }

    /// Rows whose reply went out but whose marker never landed.
    ///
    /// Returns rows ordered by send time (oldest first).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_unmarked(&self) -> Result<Vec<SentReply>> {
        let rows: Vec<SentReplyRow> = sqlx::query_as(
            "SELECT message_id, thread_id, recipient, sent_at, marked_at
             FROM sent_reply
             WHERE marked_at IS NULL
             ORDER BY sent_at ASC",
        )
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter().map(SentReplyRow::into_sent_reply).collect()
    }

    /// Purge rows marked before `before`. Unmarked rows are never purged.
    ///
    /// Returns the number of rows deleted.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn purge_marked_before(&self, before: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM sent_reply WHERE marked_at IS NOT NULL AND marked_at < ?1",
        )
        .bind(format_timestamp(before))
        .execute(self.db.as_ref())
        .await?;
        Ok(result.rows_affected())
    }
}
