//! Reply composition: address extraction, subject, RFC 5322 rendering and
//! transport encoding.

use std::sync::OnceLock;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use regex::Regex;

use crate::config::ReplyConfig;
use crate::models::candidate::Candidate;
use crate::{AppError, Result};

/// Reply prefix recognised on incoming subjects.
pub const REPLY_PREFIX: &str = "Re:";

static ANGLE_ADDRESS: OnceLock<Regex> = OnceLock::new();

fn angle_address() -> Result<&'static Regex> {
    if let Some(re) = ANGLE_ADDRESS.get() {
        return Ok(re);
    }
    let re = Regex::new(r"<([^<>]*)>")
        .map_err(|err| AppError::Config(format!("invalid address pattern: {err}")))?;
    Ok(ANGLE_ADDRESS.get_or_init(|| re))
}

/// Extract the address inside `<...>` from a `From` header.
///
/// When several bracketed groups appear the last one wins, since display
/// names may themselves contain angle brackets.
///
/// # Errors
///
/// Returns `AppError::MalformedHeader` when there is no bracketed address
/// or the brackets are empty.
pub fn extract_reply_address(from: &str) -> Result<String> {
    angle_address()?
        .captures_iter(from)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|addr| !addr.is_empty())
        .last()
        .map(str::to_owned)
        .ok_or_else(|| AppError::MalformedHeader(format!("no <address> in From header: {from:?}")))
}

/// Subject for the reply: unchanged if it already starts with `Re:`
/// (any ASCII case), otherwise prefixed.
#[must_use]
pub fn reply_subject(subject: &str) -> String {
    let trimmed = subject.trim_start();
    let has_prefix = trimmed
        .get(..REPLY_PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(REPLY_PREFIX));

    if has_prefix {
        subject.to_owned()
    } else if subject.is_empty() {
        REPLY_PREFIX.to_owned()
    } else {
        format!("{REPLY_PREFIX} {subject}")
    }
}

/// URL-safe base64 without padding, as `messages.send` expects for `raw`.
#[must_use]
pub fn encode_raw(message: &str) -> String {
    URL_SAFE_NO_PAD.encode(message.as_bytes())
}

/// Strip line breaks so a header value cannot inject further headers.
fn sanitize_header(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// RFC 2047 encoded-word for non-ASCII header values.
fn encode_header_text(value: &str) -> String {
    if value.is_ascii() {
        value.to_owned()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value.as_bytes()))
    }
}

/// Normalise any mix of line endings to CRLF.
fn to_crlf(body: &str) -> String {
    body.replace("\r\n", "\n").replace('\n', "\r\n")
}

/// A fully-resolved auto-reply ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyDraft {
    /// Optional `From` header.
    pub from: Option<String>,
    /// Recipient address.
    pub to: String,
    /// Reply subject.
    pub subject: String,
    /// Identifier threaded through `In-Reply-To` and `References`.
    pub in_reply_to: String,
    /// Plain-text body.
    pub body: String,
}

impl ReplyDraft {
    /// Derive the reply for `candidate` using the configured content.
    ///
    /// # Errors
    ///
    /// Returns `AppError::MalformedHeader` if the sender address cannot be
    /// extracted.
    pub fn for_candidate(candidate: &Candidate, reply: &ReplyConfig) -> Result<Self> {
        Ok(Self {
            from: reply.from.clone(),
            to: extract_reply_address(&candidate.from)?,
            subject: reply_subject(&candidate.subject),
            in_reply_to: candidate.reference_id().to_owned(),
            body: reply.body.clone(),
        })
    }

    /// Render as an RFC 5322 message with CRLF line endings.
    #[must_use]
    pub fn to_rfc5322(&self) -> String {
        let mut headers = Vec::with_capacity(9);
        if let Some(from) = &self.from {
            headers.push(format!("From: {}", sanitize_header(from)));
        }
        headers.push(format!("To: {}", sanitize_header(&self.to)));
        headers.push(format!(
            "Subject: {}",
            encode_header_text(&sanitize_header(&self.subject))
        ));
        let reference = sanitize_header(&self.in_reply_to);
        headers.push(format!("In-Reply-To: {reference}"));
        headers.push(format!("References: {reference}"));
        headers.push("MIME-Version: 1.0".to_owned());
        headers.push("Content-Type: text/plain; charset=\"UTF-8\"".to_owned());
        headers.push("Content-Transfer-Encoding: 8bit".to_owned());

        format!("{}\r\n\r\n{}", headers.join("\r\n"), to_crlf(&self.body))
    }

    /// Render and encode for `messages.send`.
    #[must_use]
    pub fn encode(&self) -> String {
        encode_raw(&self.to_rfc5322())
    }
}
