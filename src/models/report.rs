//! Per-cycle outcome reporting.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of processing one candidate within a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum CandidateOutcome {
    /// Reply sent and marker applied.
    Replied,
    /// Reply was already on record from an earlier cycle; only the marker was applied.
    MarkerRetried,
    /// Processing stopped; the candidate stays eligible for the next cycle.
    Failed(String),
}

impl CandidateOutcome {
    /// Whether the candidate ended the cycle marked.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// Outcome for one candidate thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateResult {
    /// Gmail message id the reply was addressed against.
    pub message_id: String,
    /// Thread the candidate belongs to.
    pub thread_id: String,
    /// What happened to it.
    pub outcome: CandidateOutcome,
}

/// Everything one find → reply → mark pass produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// 1-based cycle counter since the loop started.
    pub cycle: u64,
    /// When the cycle began.
    pub started_at: DateTime<Utc>,
    /// When the last candidate finished.
    pub finished_at: DateTime<Utc>,
    /// Set when the search itself failed and no candidate was processed.
    pub search_error: Option<String>,
    /// Per-candidate results in processing order.
    pub results: Vec<CandidateResult>,
    /// Ledger rows whose reply went out but whose marker has not landed.
    pub unmarked_replies: usize,
    /// Delay drawn before the next cycle, once scheduled.
    pub next_delay_seconds: Option<u64>,
}

impl CycleReport {
    /// Number of fresh replies sent.
    #[must_use]
    pub fn replied(&self) -> usize {
        self.count(|o| matches!(o, CandidateOutcome::Replied))
    }

    /// Number of candidates whose marker was retried without a new reply.
    #[must_use]
    pub fn marker_retried(&self) -> usize {
        self.count(|o| matches!(o, CandidateOutcome::MarkerRetried))
    }

    /// Number of candidates that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, CandidateOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&CandidateOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}
