#![forbid(unsafe_code)]

//! Gmail vacation auto-responder.
//!
//! Polls one mailbox on a randomised timer, replies once to every inbound
//! thread the owner has not answered, and labels the thread so it is never
//! picked up again.

pub mod auth;
pub mod config;
pub mod errors;
pub mod gmail;
pub mod models;
pub mod persistence;
pub mod responder;
pub mod server;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
