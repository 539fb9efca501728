//! Mail dispatcher service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request         ┌──────────────────────────────────────────────────┐
//!     ───────────────────────┼─▶ http (axum) ──▶ Dispatcher                     │
//!                            │                    │ idempotency ledger          │
//!                            │                    │ circuit breaker             │
//!                            │                    │ sliding-window limiter      │
//!                            │                    ▼                             │
//!                            │           RetryFallbackExecutor ──▶ ProviderA    │
//!                            │                    │              └─▶ ProviderB  │
//!                            │                    ▼                             │
//!                            │        status log + deferred queue               │
//!                            │                    ▲                             │
//!                            │           QueueDrainer (optional)                │
//!                            └──────────────────────────────────────────────────┘
//! ```
//!
//! `--demo` runs the one-message walkthrough (send, drain, print the log) and exits.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use mail_dispatcher::config::load_or_default;
use mail_dispatcher::dispatch::Message;
use mail_dispatcher::lifecycle::signals::wait_for_shutdown_signal;
use mail_dispatcher::lifecycle::startup::{build_dispatcher, spawn_background};
use mail_dispatcher::observability::init_logging;
use mail_dispatcher::{HttpServer, ServiceConfig, Shutdown};

#[derive(Parser)]
#[command(name = "mail-dispatcher")]
#[command(about = "Resilient email dispatch service", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Send one demo message, drain the queue, print the status log and exit
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_or_default(cli.config.as_deref())?;

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "mail-dispatcher starting");

    if cli.demo {
        return run_demo(&config).await;
    }

    tracing::info!(
        bind_address = %config.server.bind_address,
        rate_limit_per_minute = config.dispatch.rate_limit_per_minute,
        drain_interval_secs = config.dispatch.drain_interval_secs,
        "Configuration loaded"
    );

    let dispatcher = build_dispatcher(&config)?;
    let shutdown = Shutdown::new();
    let drainer = spawn_background(&config, dispatcher.clone(), &shutdown);

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        signal_shutdown.trigger();
    });

    let server = HttpServer::new(&config.server, dispatcher.clone());
    server.run(listener, shutdown.subscribe()).await?;

    shutdown.trigger();
    if let Some(handle) = drainer {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Queue drainer task failed");
        }
    }

    tracing::info!(pending = dispatcher.queue_len(), "Shutdown complete");
    Ok(())
}

async fn run_demo(config: &ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let dispatcher = build_dispatcher(config)?;

    let message = Message::new(
        "demo-1",
        "test@example.com",
        "Test",
        "This is a test email.",
    );
    let outcome = dispatcher.send(message).await;
    tracing::info!(?outcome, "Demo message dispatched");

    let report = dispatcher.process_queue().await;
    tracing::info!(processed = report.processed, sent = report.sent, "Demo queue drained");

    println!("{}", serde_json::to_string_pretty(&dispatcher.status_log())?);
    Ok(())
}
