//! Bearer-token acquisition for Gmail API calls.
//!
//! The interactive consent flow that produces a refresh token is external;
//! this module only turns an existing refresh token into short-lived access
//! tokens. Mail-store calls depend on the [`TokenProvider`] trait, never on
//! a concrete provider.

pub mod token;

use std::future::Future;
use std::pin::Pin;

use crate::Result;

pub use token::{missing_scopes, OAuthTokenProvider, StaticTokenProvider, REQUIRED_SCOPES};

/// Source of bearer tokens authorized for the mailbox.
pub trait TokenProvider: Send + Sync {
    /// Return a currently valid access token, refreshing it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Auth`](crate::AppError::Auth) if no token can be obtained.
    fn access_token(&self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>>;
}
