//! Vacation responder core.
//!
//! Four operations run on a self-rescheduling timer:
//! [`label_ensurer`] once at startup, then [`finder`], [`reply_sender`] and
//! [`marker`] every cycle for each candidate. The marker label doubles as the
//! "already handled" signal consumed by the next search; the sent-reply
//! ledger closes the gap when a reply went out but the marker did not land.

pub mod compose;
pub mod finder;
pub mod label_ensurer;
pub mod marker;
pub mod reply_sender;
pub mod runner;
pub mod schedule;
pub mod supervisor;

pub use runner::Responder;
pub use schedule::PollSchedule;
pub use supervisor::{LoopPhase, ResponderSupervisor, StatusSnapshot, TriggerOutcome};
