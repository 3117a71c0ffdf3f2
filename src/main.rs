#![forbid(unsafe_code)]

//! `vacation-responder`: Gmail auto-reply service binary.
//!
//! Bootstraps configuration and OAuth credentials, opens the sent-reply
//! ledger, and serves the HTTP trigger that starts the responder loop.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use vacation_responder::auth::{OAuthTokenProvider, TokenProvider};
use vacation_responder::config::GlobalConfig;
use vacation_responder::gmail::{build_http_client, GmailClient, MailStore};
use vacation_responder::persistence::db;
use vacation_responder::persistence::sent_reply_repo::SentReplyRepo;
use vacation_responder::responder::ResponderSupervisor;
use vacation_responder::server::{self, AppState};
use vacation_responder::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "vacation-responder", about = "Gmail vacation auto-responder", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Start the responder loop immediately instead of waiting for `GET /`.
    #[arg(long)]
    autostart: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("vacation-responder bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    if args.autostart {
        config.autostart = true;
    }
    config.load_credentials().await?;
    let config = Arc::new(config);
    info!(label = %config.label.name, "configuration loaded");

    // ── Mail store ──────────────────────────────────────
    let http = build_http_client(config.request_timeout())?;
    let tokens: Arc<dyn TokenProvider> = Arc::new(OAuthTokenProvider::new(http.clone(), &config.auth));
    // Fail fast on bad credentials rather than on the first triggered cycle.
    tokens.access_token().await?;
    let store: Arc<dyn MailStore> = Arc::new(GmailClient::new(
        http,
        config.api_base.clone(),
        config.user_id.clone(),
        tokens,
    ));
    info!("gmail client ready");

    // ── Sent-reply ledger ───────────────────────────────
    let ledger_db = Arc::new(db::open(config.ledger_path.as_deref()).await?);
    let ledger = SentReplyRepo::new(ledger_db);
    info!(persistent = config.ledger_path.is_some(), "ledger opened");

    let ct = CancellationToken::new();
    let supervisor = Arc::new(ResponderSupervisor::new(
        store,
        ledger,
        Arc::clone(&config),
        ct.clone(),
    ));

    let state = Arc::new(AppState {
        config: Arc::clone(&config),
        supervisor: Arc::clone(&supervisor),
    });

    // ── Start HTTP trigger ──────────────────────────────
    let server_ct = ct.clone();
    let server_state = Arc::clone(&state);
    let server_handle = tokio::spawn(async move {
        if let Err(err) = server::serve(server_state, server_ct).await {
            error!(%err, "http server failed");
        }
    });

    if config.autostart {
        let outcome = supervisor.trigger();
        info!(?outcome, "autostart");
    }

    // ── Wait for shutdown signal ────────────────────────
    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    supervisor.shutdown().await;
    let _ = server_handle.await;
    info!("vacation-responder shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
