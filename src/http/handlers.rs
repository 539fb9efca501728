use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::dispatch::{DispatchOutcome, DrainReport, Message, StatusEvent};
use crate::http::server::AppState;
use crate::resilience::CircuitState;

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub outcome: DispatchOutcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub queue_depth: usize,
    pub dead_letters: usize,
    pub breaker: CircuitState,
}

/// Every modelled outcome is a 200: the message was either delivered or queued.
///
/// The dispatch runs on its own task, so a request timeout or a dropped client
/// never cuts an attempt short.
pub async fn send_email(
    State(state): State<AppState>,
    Json(message): Json<Message>,
) -> Result<Json<SendResponse>, StatusCode> {
    tracing::debug!(message_id = %message.id, to = %message.to, "Send request received");
    let dispatcher = state.dispatcher.clone();
    let outcome = tokio::spawn(async move { dispatcher.send(message).await })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Dispatch task failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(SendResponse {
        message: "Email sent or queued",
        outcome,
    }))
}

pub async fn status_log(State(state): State<AppState>) -> Json<Vec<StatusEvent>> {
    Json(state.dispatcher.status_log())
}

pub async fn process_queue(State(state): State<AppState>) -> Result<Json<DrainReport>, StatusCode> {
    let dispatcher = state.dispatcher.clone();
    tokio::spawn(async move { dispatcher.process_queue().await })
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!(error = %e, "Queue drain task failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    let dispatcher = &state.dispatcher;
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        queue_depth: dispatcher.queue_len(),
        dead_letters: dispatcher.dead_letters().len(),
        breaker: dispatcher.breaker_state(),
    })
}
