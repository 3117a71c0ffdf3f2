//! Start-once supervision of the responder loop.
//!
//! The loop is launched by an external trigger. Repeated triggers while it
//! is starting or running are acknowledged without launching a second loop,
//! so at most one cycle is ever in flight.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};

use super::runner::Responder;
use super::schedule::PollSchedule;
use crate::config::GlobalConfig;
use crate::gmail::MailStore;
use crate::models::report::CycleReport;
use crate::persistence::sent_reply_repo::SentReplyRepo;

/// Lifecycle phase of the responder loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    /// Not started yet.
    Idle,
    /// Ensuring the marker label.
    Starting,
    /// Cycling.
    Running,
    /// Startup failed; a new trigger may retry.
    Failed,
    /// Shut down.
    Stopped,
}

/// Observable state of the loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    /// Current phase.
    pub phase: LoopPhase,
    /// Marker label id once resolved.
    pub label_id: Option<String>,
    /// Cycles completed since the loop started.
    pub cycles_completed: u64,
    /// Most recent cycle report.
    pub last_cycle: Option<CycleReport>,
    /// Startup failure reason, if any.
    pub last_error: Option<String>,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            phase: LoopPhase::Idle,
            label_id: None,
            cycles_completed: 0,
            last_cycle: None,
            last_error: None,
        }
    }
}

/// What a trigger did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A new loop task was launched.
    Started,
    /// A loop was already starting or running.
    AlreadyRunning,
    /// The supervisor has been shut down.
    ShuttingDown,
}

/// Owns the loop task and its shared status.
pub struct ResponderSupervisor {
    store: Arc<dyn MailStore>,
    ledger: SentReplyRepo,
    config: Arc<GlobalConfig>,
    cancel: CancellationToken,
    status: Arc<Mutex<StatusSnapshot>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ResponderSupervisor {
    /// Create an idle supervisor.
    #[must_use]
    pub fn new(
        store: Arc<dyn MailStore>,
        ledger: SentReplyRepo,
        config: Arc<GlobalConfig>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            ledger,
            config,
            cancel,
            status: Arc::new(Mutex::new(StatusSnapshot::default())),
            task: Mutex::new(None),
        }
    }

    /// Launch the loop unless one is already starting or running.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn trigger(&self) -> TriggerOutcome {
        if self.cancel.is_cancelled() {
            return TriggerOutcome::ShuttingDown;
        }

        {
            let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
            match status.phase {
                LoopPhase::Starting | LoopPhase::Running => return TriggerOutcome::AlreadyRunning,
                LoopPhase::Stopped => return TriggerOutcome::ShuttingDown,
                LoopPhase::Idle | LoopPhase::Failed => {
                    status.phase = LoopPhase::Starting;
                    status.last_error = None;
                }
            }
        }

        let handle = tokio::spawn(
            run_supervised(
                Arc::clone(&self.store),
                self.ledger.clone(),
                Arc::clone(&self.config),
                self.cancel.clone(),
                Arc::clone(&self.status),
            )
            .instrument(info_span!("responder")),
        );
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        info!("responder loop triggered");
        TriggerOutcome::Started
    }

    /// Copy of the current status.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Cancel the loop and wait for the task to exit.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .phase = LoopPhase::Stopped;
    }
}

async fn run_supervised(
    store: Arc<dyn MailStore>,
    ledger: SentReplyRepo,
    config: Arc<GlobalConfig>,
    cancel: CancellationToken,
    status: Arc<Mutex<StatusSnapshot>>,
) {
    let responder = match Responder::start(store, ledger, Arc::clone(&config)).await {
        Ok(responder) => responder,
        Err(err) => {
            error!(%err, "responder startup failed");
            let mut status = status.lock().unwrap_or_else(PoisonError::into_inner);
            status.phase = LoopPhase::Failed;
            status.last_error = Some(err.to_string());
            return;
        }
    };

    {
        let mut status = status.lock().unwrap_or_else(PoisonError::into_inner);
        status.phase = LoopPhase::Running;
        status.label_id = Some(responder.label_id().to_owned());
    }

    let schedule = PollSchedule::from(&config.schedule);
    let sink = Arc::clone(&status);
    responder
        .run_loop(schedule, &cancel, move |report| {
            let mut status = sink.lock().unwrap_or_else(PoisonError::into_inner);
            status.cycles_completed = report.cycle;
            status.last_cycle = Some(report.clone());
        })
        .await;

    status.lock().unwrap_or_else(PoisonError::into_inner).phase = LoopPhase::Stopped;
}
