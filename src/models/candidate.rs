//! Candidate message model: an inbound message awaiting its auto-reply.

use serde::Serialize;

use crate::gmail::MessageMetadata;
use crate::{AppError, Result};

/// Headers requested when loading a candidate.
pub const CANDIDATE_HEADERS: [&str; 3] = ["Subject", "From", "Message-ID"];

/// An inbound message eligible for an auto-reply.
///
/// Read-only view over the mail store's copy; the responder never mutates
/// it beyond applying the marker label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    /// Opaque Gmail message id.
    pub id: String,
    /// Thread the message represents for labeling purposes.
    pub thread_id: String,
    /// Raw `From` header.
    pub from: String,
    /// Raw `Subject` header; empty when the sender omitted it.
    pub subject: String,
    /// RFC 5322 `Message-ID`, when present.
    pub rfc_message_id: Option<String>,
}

impl Candidate {
    /// Build a candidate from a metadata fetch.
    ///
    /// # Errors
    ///
    /// Returns `AppError::MalformedHeader` if the message has no `From` header.
    pub fn from_metadata(meta: &MessageMetadata) -> Result<Self> {
        let from = meta
            .header("From")
            .ok_or_else(|| AppError::MalformedHeader(format!("message {} has no From header", meta.id)))?
            .to_owned();

        Ok(Self {
            id: meta.id.clone(),
            thread_id: meta.thread_id.clone(),
            from,
            subject: meta.header("Subject").unwrap_or_default().to_owned(),
            rfc_message_id: meta
                .header("Message-ID")
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned),
        })
    }

    /// Identifier used for `In-Reply-To` and `References`.
    ///
    /// Prefers the RFC 5322 `Message-ID` and falls back to the Gmail id.
    #[must_use]
    pub fn reference_id(&self) -> &str {
        self.rfc_message_id.as_deref().unwrap_or(&self.id)
    }
}
