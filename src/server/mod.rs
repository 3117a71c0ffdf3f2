//! HTTP trigger and health surface.
//!
//! `GET /` starts the responder loop and always acknowledges, whether or not
//! a loop was already running. Background failures only ever reach the logs
//! and `GET /status`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::GlobalConfig;
use crate::responder::{ResponderSupervisor, StatusSnapshot, TriggerOutcome};
use crate::{AppError, Result};

/// Shared state behind every route.
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<GlobalConfig>,
    /// Owner of the responder loop.
    pub supervisor: Arc<ResponderSupervisor>,
}

/// Handler for `GET /`: start the loop and acknowledge.
async fn trigger(State(state): State<Arc<AppState>>) -> &'static str {
    match state.supervisor.trigger() {
        TriggerOutcome::Started => info!("trigger accepted, responder starting"),
        TriggerOutcome::AlreadyRunning => info!("trigger received, responder already running"),
        TriggerOutcome::ShuttingDown => info!("trigger received during shutdown"),
    }
    "vacation responder started"
}

/// Handler for `GET /health`: 200 OK with a plain-text body.
async fn health() -> &'static str {
    "ok"
}

/// Handler for `GET /status`: loop phase and last cycle report.
async fn status(State(state): State<Arc<AppState>>) -> Json<StatusSnapshot> {
    Json(state.supervisor.snapshot())
}

/// Build the router without binding.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(trigger))
        .route("/health", get(health))
        .route("/status", get(status))
        .with_state(state)
}

/// Serve on `127.0.0.1:{config.http_port}` until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Config` if the listener cannot bind.
pub async fn serve(state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    let bind = SocketAddr::from(([127, 0, 0, 1], state.config.http_port));
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind {bind}: {err}")))?;
    serve_listener(listener, state, ct).await
}

/// Serve on an already-bound listener until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Io` if the server fails while running.
pub async fn serve_listener(
    listener: TcpListener,
    state: Arc<AppState>,
    ct: CancellationToken,
) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "trigger endpoint listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Io(format!("http server failed: {err}")))
}
