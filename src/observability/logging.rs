//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Log every dispatch status event through the default `StatusSink`
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level
//! - Status events keep the `[timestamp] [STATUS] [provider] Email ID: id` line shape

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ObservabilityConfig;
use crate::dispatch::{DispatchStatus, StatusEvent, StatusSink};

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(config: &ObservabilityConfig) {
    let default_filter = format!(
        "mail_dispatcher={level},tower_http={level}",
        level = config.log_level
    );

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Renders a status event the way the service has always logged them.
pub fn format_event(event: &StatusEvent) -> String {
    format!(
        "[{}] [{}] [{}] Email ID: {}",
        event.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        event.status,
        event.provider,
        event.message_id
    )
}

/// Default sink: one log line per status event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn record(&self, event: &StatusEvent) {
        let line = format_event(event);
        match event.status {
            DispatchStatus::Failed => tracing::warn!(
                message_id = %event.message_id,
                status = %event.status,
                provider = %event.provider,
                "{line}"
            ),
            _ => tracing::info!(
                message_id = %event.message_id,
                status = %event.status,
                provider = %event.provider,
                "{line}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_event_line_shape() {
        let event = StatusEvent {
            message_id: "demo-1".into(),
            status: DispatchStatus::Sent,
            provider: "ProviderA".into(),
            timestamp: chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        };
        assert_eq!(
            format_event(&event),
            "[2024-05-01T12:00:00.000Z] [SENT] [ProviderA] Email ID: demo-1"
        );
    }
}
