//! Dispatch data model: messages, statuses and the event log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reason labels recorded in [`StatusEvent::provider`] when no provider was involved.
pub mod labels {
    pub const IDEMPOTENT_SKIP: &str = "IDEMPOTENT_SKIP";
    pub const REJECTED: &str = "REJECTED";
    pub const RATELIMIT: &str = "RATELIMIT";
    pub const IN_FLIGHT: &str = "IN_FLIGHT";
    pub const FALLBACK_FAILED: &str = "FALLBACK_FAILED";
    pub const QUEUE: &str = "QUEUE";
    pub const DEAD_LETTER: &str = "DEAD_LETTER";
    pub const CANCELLED: &str = "CANCELLED";

    /// Label for the `RETRYING` event of a failed round (1-based).
    pub fn attempt(round_index: u32) -> String {
        format!("Attempt {}", round_index + 1)
    }
}

/// An email submitted for delivery. Identity is `id`, assigned by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Observable state transition of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DispatchStatus {
    #[serde(rename = "SENT")]
    Sent,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "RETRYING")]
    Retrying,
    #[serde(rename = "QUEUED")]
    Queued,
    #[serde(rename = "CIRCUIT_BREAKER")]
    CircuitBreakerRejected,
    #[serde(rename = "IDEMPOTENT_SKIP")]
    IdempotentSkip,
}

impl DispatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "SENT",
            Self::Failed => "FAILED",
            Self::Retrying => "RETRYING",
            Self::Queued => "QUEUED",
            Self::CircuitBreakerRejected => "CIRCUIT_BREAKER",
            Self::IdempotentSkip => "IDEMPOTENT_SKIP",
        }
    }
}

impl std::fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the append-only event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    #[serde(rename = "emailId")]
    pub message_id: String,
    pub status: DispatchStatus,
    /// Provider name for `SENT`, otherwise a reason label from [`labels`].
    pub provider: String,
    pub timestamp: DateTime<Utc>,
}

/// Why a message was put back on the deferred queue without a provider attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferReason {
    RateLimited,
    CircuitOpen,
    InFlight,
}

/// Typed result of a single `send` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Sent { provider: String },
    Skipped,
    Deferred { reason: DeferReason },
    /// Every round failed; the message was re-queued.
    Failed { rounds: u32 },
    DeadLettered { deferrals: u32 },
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

/// Summary of one `process_queue` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainReport {
    pub processed: usize,
    pub sent: usize,
    pub skipped: usize,
    pub deferred: usize,
    pub failed: usize,
    pub dead_lettered: usize,
}

impl DrainReport {
    pub fn record(&mut self, outcome: &DispatchOutcome) {
        self.processed += 1;
        match outcome {
            DispatchOutcome::Sent { .. } => self.sent += 1,
            DispatchOutcome::Skipped => self.skipped += 1,
            DispatchOutcome::Deferred { .. } => self.deferred += 1,
            DispatchOutcome::Failed { .. } => self.failed += 1,
            DispatchOutcome::DeadLettered { .. } => self.dead_lettered += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_event_wire_shape() {
        let event = StatusEvent {
            message_id: "q4".into(),
            status: DispatchStatus::Queued,
            provider: labels::RATELIMIT.into(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["emailId"], "q4");
        assert_eq!(json["status"], "QUEUED");
        assert_eq!(json["provider"], "RATELIMIT");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_breaker_status_name() {
        let json = serde_json::to_string(&DispatchStatus::CircuitBreakerRejected).unwrap();
        assert_eq!(json, "\"CIRCUIT_BREAKER\"");
        assert_eq!(DispatchStatus::IdempotentSkip.to_string(), "IDEMPOTENT_SKIP");
    }

    #[test]
    fn test_attempt_label_is_one_based() {
        assert_eq!(labels::attempt(0), "Attempt 1");
        assert_eq!(labels::attempt(2), "Attempt 3");
    }

    #[test]
    fn test_drain_report_counts() {
        let mut report = DrainReport::default();
        report.record(&DispatchOutcome::Sent { provider: "ProviderA".into() });
        report.record(&DispatchOutcome::Deferred { reason: DeferReason::RateLimited });
        report.record(&DispatchOutcome::Skipped);
        assert_eq!(report.processed, 3);
        assert_eq!(report.sent, 1);
        assert_eq!(report.deferred, 1);
        assert_eq!(report.skipped, 1);
    }
}
