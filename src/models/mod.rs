//! Domain model module declarations.

pub mod candidate;
pub mod report;
pub mod sent_reply;
