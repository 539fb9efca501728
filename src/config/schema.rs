//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the dispatcher
//! service. All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::RetryPolicy;

/// Root configuration for the dispatcher service.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings.
    pub server: ServerConfig,

    /// Dispatch policy (rate limit, breaker, retries).
    pub dispatch: DispatchConfig,

    /// The two simulated transports.
    pub providers: ProvidersConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Request timeout in seconds. Must cover a full retry sequence.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            request_timeout_secs: 60,
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Dispatch policy for one dispatcher instance.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum attempts started per sliding 60s window.
    pub rate_limit_per_minute: u32,

    /// Consecutive failed dispatches before the breaker opens.
    pub breaker_threshold: u32,

    /// Time after the last failure before an open breaker lets attempts through.
    pub breaker_cooldown_ms: u64,

    /// Rounds of primary + fallback per dispatch.
    pub max_retries: u32,

    /// Exponential backoff base in milliseconds.
    pub base_backoff_ms: u64,

    /// Upper bound for a single backoff delay in milliseconds.
    pub max_backoff_ms: u64,

    /// Random jitter added to each backoff, as a fraction of the delay (0.0 = exact).
    pub backoff_jitter: f64,

    /// Optional deadline for a single provider call.
    pub provider_timeout_ms: Option<u64>,

    /// Optional cap on how often one message may be deferred before it is dead-lettered.
    pub max_deferrals: Option<u32>,

    /// Interval of the background queue drainer in seconds (0 = disabled).
    pub drain_interval_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_minute: 5,
            breaker_threshold: 5,
            breaker_cooldown_ms: 30_000,
            max_retries: 3,
            base_backoff_ms: 1000,
            max_backoff_ms: 60_000,
            backoff_jitter: 0.0,
            provider_timeout_ms: None,
            max_deferrals: None,
            drain_interval_secs: 0,
        }
    }
}

impl DispatchConfig {
    pub fn breaker_cooldown(&self) -> Duration {
        Duration::from_millis(self.breaker_cooldown_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_backoff_ms: self.base_backoff_ms,
            max_backoff_ms: self.max_backoff_ms,
            jitter_ratio: self.backoff_jitter,
            call_timeout: self.provider_timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Primary and secondary transport settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ProvidersConfig {
    pub primary: ProviderConfig,
    pub secondary: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            primary: ProviderConfig {
                name: "ProviderA".to_string(),
                success_rate: 0.7,
            },
            secondary: ProviderConfig {
                name: "ProviderB".to_string(),
                success_rate: 0.8,
            },
        }
    }
}

/// A simulated transport.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ProviderConfig {
    /// Label recorded on `SENT` events.
    pub name: String,

    /// Probability in `[0, 1]` that a call succeeds.
    pub success_rate: f64,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
