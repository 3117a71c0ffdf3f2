//! Unreplied Thread Finder: search the mailbox for candidate messages.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::gmail::{MailStore, MessageRef};
use crate::Result;

/// Gmail search filter selecting messages that still need an auto-reply.
///
/// Each enabled term excludes one class of message; terms are combined
/// conjunctively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchFilter {
    /// Exclude chat transcripts (`-in:chats`).
    pub exclude_chats: bool,
    /// Exclude messages sent by the mailbox owner (`-from:me`).
    pub exclude_self: bool,
    /// Exclude messages already carrying any user label (`-has:userlabels`).
    pub exclude_user_labeled: bool,
}

impl SearchFilter {
    /// The filter used by the responder: all three exclusions.
    #[must_use]
    pub fn unreplied() -> Self {
        Self {
            exclude_chats: true,
            exclude_self: true,
            exclude_user_labeled: true,
        }
    }

    /// Render as a Gmail `q` expression.
    #[must_use]
    pub fn query(&self) -> String {
        let mut terms = Vec::with_capacity(3);
        if self.exclude_chats {
            terms.push("-in:chats");
        }
        if self.exclude_self {
            terms.push("-from:me");
        }
        if self.exclude_user_labeled {
            terms.push("-has:userlabels");
        }
        terms.join(" ")
    }
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self::unreplied()
    }
}

/// Unanswered messages of one thread, answered with a single reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateThread {
    /// Thread id, or the message id for a message listed without one.
    pub key: String,
    /// First-listed matching message; the reply is addressed against it.
    pub representative: MessageRef,
    /// Ids of every matching message in the thread, representative first.
    pub message_ids: Vec<String>,
}

/// Thread key for `message`: its thread id, or its own id when unthreaded.
#[must_use]
pub fn thread_key(message: &MessageRef) -> &str {
    if message.thread_id.is_empty() {
        &message.id
    } else {
        &message.thread_id
    }
}

/// Group messages by thread, keeping first-seen order of threads and of
/// messages within each thread. Repeated ids are dropped.
#[must_use]
pub fn group_by_thread(messages: Vec<MessageRef>) -> Vec<CandidateThread> {
    let mut seen = HashSet::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut threads: Vec<CandidateThread> = Vec::new();

    for message in messages {
        if !seen.insert(message.id.clone()) {
            continue;
        }
        let key = thread_key(&message).to_owned();
        match index.get(&key) {
            Some(&i) => threads[i].message_ids.push(message.id),
            None => {
                index.insert(key.clone(), threads.len());
                threads.push(CandidateThread {
                    key,
                    message_ids: vec![message.id.clone()],
                    representative: message,
                });
            }
        }
    }

    threads
}

/// Collect every message matching `filter`, following pagination, grouped
/// into one candidate per thread.
///
/// # Errors
///
/// Propagates the first store failure; a partial result is discarded.
pub async fn find_candidates(
    store: &dyn MailStore,
    filter: &SearchFilter,
) -> Result<Vec<CandidateThread>> {
    let query = filter.query();
    let mut messages = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let page = store.list_messages(&query, page_token.as_deref()).await?;
        messages.extend(page.messages);

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    let found = messages.len();
    let threads = group_by_thread(messages);
    debug!(query, messages = found, threads = threads.len(), "candidate search complete");
    Ok(threads)
}
