//! Timeout enforcement for provider calls.
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Optional: without a configured deadline the call is awaited as-is
//! - A timed-out call is an ordinary `ProviderError` and triggers fallback like any other failure

use std::time::Duration;

use crate::dispatch::Message;
use crate::error::ProviderError;
use crate::providers::Provider;

pub async fn call_with_timeout(
    provider: &dyn Provider,
    message: &Message,
    timeout: Option<Duration>,
) -> Result<(), ProviderError> {
    let Some(limit) = timeout else {
        return provider.send(message).await;
    };

    match tokio::time::timeout(limit, provider.send(message)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                provider = %provider.name(),
                message_id = %message.id,
                timeout_ms = limit.as_millis() as u64,
                "Provider call timed out"
            );
            Err(ProviderError::Timeout {
                provider: provider.name().to_string(),
                timeout_ms: limit.as_millis() as u64,
            })
        }
    }
}
