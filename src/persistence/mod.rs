//! Persistence layer modules.

pub mod db;
pub mod schema;
pub mod sent_reply_repo;

/// Re-export the database pool type for convenience.
pub use sqlx::SqlitePool;
