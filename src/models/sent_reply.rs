//! Sent-reply ledger record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Local record that an auto-reply went out for a message.
///
/// Guards against a second reply when the marker label could not be
/// applied after a successful send.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SentReply {
    /// Gmail id of the message that was answered.
    pub message_id: String,
    /// Thread the reply joined; the message id when it was unthreaded.
    pub thread_id: String,
    /// Address the reply was sent to.
    pub recipient: String,
    /// When the reply was accepted by the mail store.
    pub sent_at: DateTime<Utc>,
    /// When the marker label was applied; `None` while the window is open.
    pub marked_at: Option<DateTime<Utc>>,
}

impl SentReply {
    /// Record a reply sent now, not yet marked.
    #[must_use]
    pub fn new(message_id: String, thread_id: String, recipient: String) -> Self {
        Self {
            message_id,
            thread_id,
            recipient,
            sent_at: Utc::now(),
            marked_at: None,
        }
    }
}
