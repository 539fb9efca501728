//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router over one shared dispatcher
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Serve until the shutdown broadcast fires
//!
//! # Routes
//! - `POST /send-email`: dispatch one message
//! - `GET /status-log`: the full event log
//! - `POST /process-queue`: replay the deferred queue once
//! - `GET /health`: queue depth and breaker state

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::http::handlers;
use crate::lifecycle::shutdown;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

/// HTTP front end for the dispatcher.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &ServerConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            router: build_router(config, dispatcher),
        }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown_rx))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(config: &ServerConfig, dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/send-email", post(handlers::send_email))
        .route("/status-log", get(handlers::status_log))
        .route("/process-queue", post(handlers::process_queue))
        .route("/health", get(handlers::health))
        .with_state(AppState { dispatcher })
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
