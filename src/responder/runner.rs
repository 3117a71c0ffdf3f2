//! The responder loop: ensure the label once, then find → reply → mark on a
//! randomised timer.
//!
//! Each cycle is strictly sequential and the next delay is drawn only after
//! the whole candidate list has been processed, so two cycles never overlap.
//! Candidates are whole threads: one reply goes out per thread and the
//! marker lands on every matching message in it. A failing candidate is
//! logged and recorded in the [`CycleReport`]; it never aborts the rest of
//! the cycle.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::finder::{find_candidates, CandidateThread, SearchFilter};
use super::label_ensurer::ensure_label;
use super::marker::apply_marker;
use super::reply_sender::send_reply;
use super::schedule::PollSchedule;
use crate::config::GlobalConfig;
use crate::gmail::MailStore;
use crate::models::report::{CandidateOutcome, CandidateResult, CycleReport};
use crate::models::sent_reply::SentReply;
use crate::persistence::sent_reply_repo::SentReplyRepo;
use crate::{AppError, Result};

/// A started responder holding the resolved marker label id.
pub struct Responder {
    store: Arc<dyn MailStore>,
    ledger: SentReplyRepo,
    config: Arc<GlobalConfig>,
    filter: SearchFilter,
    label_id: String,
}

impl Responder {
    /// Ensure the marker label exists and return a responder ready to cycle.
    ///
    /// # Errors
    ///
    /// Propagates any label-store failure other than a name conflict.
    pub async fn start(
        store: Arc<dyn MailStore>,
        ledger: SentReplyRepo,
        config: Arc<GlobalConfig>,
    ) -> Result<Self> {
        let label_id = ensure_label(store.as_ref(), &config.label).await?;
        info!(label = %config.label.name, %label_id, "responder ready");

        match ledger.list_unmarked().await {
            Ok(rows) => {
                for row in &rows {
                    warn!(
                        message_id = %row.message_id,
                        thread_id = %row.thread_id,
                        sent_at = %row.sent_at,
                        "reply on record without marker, marker will be retried"
                    );
                }
            }
            Err(err) => warn!(%err, "ledger scan failed"),
        }
        Ok(Self {
            store,
            ledger,
            config,
            filter: SearchFilter::unreplied(),
            label_id,
        })
    }

    /// The marker label id resolved at startup.
    #[must_use]
    pub fn label_id(&self) -> &str {
        &self.label_id
    }

    /// Run one full find → reply → mark pass.
    pub async fn run_cycle(&self, cycle: u64) -> CycleReport {
        let started_at = Utc::now();
        self.purge_ledger().await;

        let candidates = match find_candidates(self.store.as_ref(), &self.filter).await {
            Ok(candidates) => candidates,
            Err(err) => {
                error!(cycle, %err, "candidate search failed");
                return CycleReport {
                    cycle,
                    started_at,
                    finished_at: Utc::now(),
                    search_error: Some(err.to_string()),
                    results: Vec::new(),
                    unmarked_replies: self.count_unmarked().await,
                    next_delay_seconds: None,
                };
            }
        };

        info!(cycle, threads = candidates.len(), "candidates found");

        let mut results = Vec::with_capacity(candidates.len());
        for thread in &candidates {
            let outcome = self.process_candidate(thread).await;
            results.push(CandidateResult {
                message_id: thread.representative.id.clone(),
                thread_id: thread.key.clone(),
                outcome,
            });
        }

        CycleReport {
            cycle,
            started_at,
            finished_at: Utc::now(),
            search_error: None,
            results,
            unmarked_replies: self.count_unmarked().await,
            next_delay_seconds: None,
        }
    }

    /// Cycle until `cancel` fires, sleeping a fresh random delay between
    /// cycles. `on_cycle` observes every finished report.
    pub async fn run_loop<F>(&self, schedule: PollSchedule, cancel: &CancellationToken, mut on_cycle: F)
    where
        F: FnMut(&CycleReport) + Send,
    {
        let mut cycle: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            cycle += 1;
            let mut report = self
                .run_cycle(cycle)
                .instrument(info_span!("cycle", cycle))
                .await;

            let delay = schedule.next_delay();
            report.next_delay_seconds = Some(delay.as_secs());
            info!(
                cycle,
                replied = report.replied(),
                marker_retried = report.marker_retried(),
                failed = report.failed(),
                delay_secs = delay.as_secs(),
                "cycle complete"
            );
            on_cycle(&report);

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        info!(cycles = cycle, "responder loop stopped");
    }

    async fn process_candidate(&self, thread: &CandidateThread) -> CandidateOutcome {
        match self.reply_and_mark(thread).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(thread_id = %thread.key, %err, "candidate failed");
                CandidateOutcome::Failed(err.to_string())
            }
        }
    }

    async fn reply_and_mark(&self, thread: &CandidateThread) -> Result<CandidateOutcome> {
        // An unreadable ledger must not risk a duplicate reply.
        let already_sent = self.ledger.find_for_thread(&thread.key).await?.is_some();
        let mut ledger_lost = None;

        if already_sent {
            info!(thread_id = %thread.key, "reply already on record, retrying marker only");
        } else {
            let sent = send_reply(self.store.as_ref(), &thread.representative, &self.config.reply).await?;
            let record = SentReply::new(
                thread.representative.id.clone(),
                thread.key.clone(),
                sent.recipient.clone(),
            );
            if let Err(err) = self.ledger.record_sent(&record).await {
                warn!(thread_id = %thread.key, %err, "failed to record sent reply");
                ledger_lost = Some(err);
            }
        }

        if let Err(err) = self.mark_thread(thread).await {
            return Err(match ledger_lost {
                Some(ledger_err) => AppError::Db(format!(
                    "reply sent but not recorded ({ledger_err}) and marker failed ({err}); \
                     the next cycle may reply again"
                )),
                None => err,
            });
        }

        if ledger_lost.is_none() {
            if let Err(err) = self.ledger.record_marked(&thread.key).await {
                warn!(thread_id = %thread.key, %err, "failed to record marker in ledger");
            }
        }

        Ok(if already_sent {
            CandidateOutcome::MarkerRetried
        } else {
            CandidateOutcome::Replied
        })
    }

    /// Label every matching message of the thread; stops at the first failure.
    async fn mark_thread(&self, thread: &CandidateThread) -> Result<()> {
        for message_id in &thread.message_ids {
            apply_marker(self.store.as_ref(), message_id, &self.label_id).await?;
        }
        Ok(())
    }

    async fn count_unmarked(&self) -> usize {
        match self.ledger.list_unmarked().await {
            Ok(rows) => rows.len(),
            Err(err) => {
                warn!(%err, "ledger scan failed");
                0
            }
        }
    }

    async fn purge_ledger(&self) {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(self.config.retention_days));
        match self.ledger.purge_marked_before(cutoff).await {
            Ok(0) => {}
            Ok(purged) => debug!(purged, "purged marked ledger rows"),
            Err(err) => warn!(%err, "ledger purge failed"),
        }
    }
}
