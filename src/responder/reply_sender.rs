//! Reply Sender: compose and send exactly one auto-reply for a candidate.

use tracing::info;

use super::compose::ReplyDraft;
use crate::config::ReplyConfig;
use crate::gmail::{MailStore, MessageRef};
use crate::models::candidate::{Candidate, CANDIDATE_HEADERS};
use crate::Result;

/// What went out for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReplyInfo {
    /// The candidate as loaded from its headers.
    pub candidate: Candidate,
    /// Address the reply was sent to.
    pub recipient: String,
    /// Gmail id of the outbound message.
    pub sent_id: String,
}

/// Fetch the candidate's headers, build the reply and send it once.
///
/// No retry is attempted; any failure propagates to the caller.
///
/// # Errors
///
/// Returns `AppError::MalformedHeader` if the `From` header is missing or
/// carries no `<address>`, and propagates store failures.
pub async fn send_reply(
    store: &dyn MailStore,
    message: &MessageRef,
    reply: &ReplyConfig,
) -> Result<SentReplyInfo> {
    let meta = store
        .get_message_metadata(&message.id, &CANDIDATE_HEADERS)
        .await?;
    let mut candidate = Candidate::from_metadata(&meta)?;
    if candidate.thread_id.is_empty() {
        candidate.thread_id.clone_from(&message.thread_id);
    }

    let draft = ReplyDraft::for_candidate(&candidate, reply)?;
    let raw = draft.encode();
    let thread_id = Some(candidate.thread_id.as_str()).filter(|t| !t.is_empty());
    let sent = store.send_raw(&raw, thread_id).await?;

    info!(
        message_id = %candidate.id,
        sent_id = %sent.id,
        recipient = %draft.to,
        "auto-reply sent"
    );

    Ok(SentReplyInfo {
        recipient: draft.to,
        sent_id: sent.id,
        candidate,
    })
}
