//! Mail-store abstraction and its Gmail REST implementation.
//!
//! The [`MailStore`] trait is the seam between the responder core and the
//! remote mailbox. [`GmailClient`] talks to the real API; tests provide
//! an in-memory store with the same filter semantics.

pub mod client;
pub mod types;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;

use crate::{AppError, Result};

pub use client::GmailClient;
pub use types::{
    Label, LabelVisibility, MessageHeader, MessageListPage, MessageMetadata, MessagePayload,
    MessageRef, SentMessage,
};

/// Boxed future returned by [`MailStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// System label every inbound message carries until it is archived.
pub const INBOX_LABEL: &str = "INBOX";

/// Operations the responder needs from the mailbox.
pub trait MailStore: Send + Sync {
    /// Search messages with a Gmail query, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Gmail`] on transport or API failure.
    fn list_messages<'a>(
        &'a self,
        query: &'a str,
        page_token: Option<&'a str>,
    ) -> StoreFuture<'a, MessageListPage>;

    /// Fetch a message's metadata restricted to `headers`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] for unknown ids and
    /// [`AppError::Gmail`] on other failures.
    fn get_message_metadata<'a>(
        &'a self,
        id: &'a str,
        headers: &'a [&'a str],
    ) -> StoreFuture<'a, MessageMetadata>;

    /// Send a URL-safe base64 encoded RFC 5322 message.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Gmail`] if the send is rejected.
    fn send_raw<'a>(&'a self, raw: &'a str, thread_id: Option<&'a str>)
        -> StoreFuture<'a, SentMessage>;

    /// Add and remove labels on one message in a single request.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] for unknown ids and
    /// [`AppError::Gmail`] on other failures.
    fn modify_labels<'a>(
        &'a self,
        id: &'a str,
        add: &'a [String],
        remove: &'a [String],
    ) -> StoreFuture<'a, ()>;

    /// Create a user label.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] when a label with that name exists.
    fn create_label<'a>(
        &'a self,
        name: &'a str,
        visibility: &'a LabelVisibility,
    ) -> StoreFuture<'a, Label>;

    /// List every label in the mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Gmail`] on transport or API failure.
    fn list_labels(&self) -> StoreFuture<'_, Vec<Label>>;
}

/// Build the shared HTTP client with a per-request timeout.
///
/// # Errors
///
/// Returns `AppError::Config` if the TLS backend cannot be initialised.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("vacation-responder/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))
}
