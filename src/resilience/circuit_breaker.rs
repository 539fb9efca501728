//! Circuit breaker guarding the providers.
//!
//! # States
//! - Closed: normal operation, dispatches proceed
//! - Open: providers assumed down, dispatches are deferred without an attempt
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= threshold (stamped with that failure's time)
//! Open → Closed: evaluated lazily on the next check, once now - opened_at >= cooldown;
//!                the failure counter resets before the caller proceeds
//! ```
//!
//! # Design Decisions
//! - One breaker per dispatcher, shared by both providers
//! - No half-open probe: the first dispatch after cooldown is a normal attempt
//! - Every failure re-stamps `opened_at`, so failures that land while open extend the cooldown
//! - A success clears the counter but never shortens an open breaker's cooldown
//! - The breaker holds no lock of its own; it lives inside the dispatcher state

use std::time::{Duration, Instant};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
        }
    }
}

/// Result of consulting the breaker before a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerDecision {
    Allow,
    /// Cooldown elapsed; the breaker closed and the failure count was reset.
    Reset,
    Reject { retry_in: Duration },
}

#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    consecutive_failures: u32,
    state: CircuitState,
    opened_at: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
            consecutive_failures: 0,
            state: CircuitState::Closed,
            opened_at: None,
        }
    }

    pub fn check(&mut self, now: Instant) -> BreakerDecision {
        if self.state == CircuitState::Closed {
            return BreakerDecision::Allow;
        }

        let elapsed = self
            .opened_at
            .map(|opened_at| now.saturating_duration_since(opened_at))
            .unwrap_or(self.cooldown);

        if elapsed >= self.cooldown {
            self.state = CircuitState::Closed;
            self.consecutive_failures = 0;
            self.opened_at = None;
            tracing::info!(cooldown_ms = self.cooldown.as_millis() as u64, "Circuit breaker closed after cooldown");
            BreakerDecision::Reset
        } else {
            BreakerDecision::Reject {
                retry_in: self.cooldown - elapsed,
            }
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Count a failed dispatch. Returns `true` when this failure tripped the breaker.
    pub fn record_failure(&mut self, now: Instant) -> bool {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        if self.consecutive_failures < self.threshold {
            return false;
        }

        self.opened_at = Some(now);
        let tripped = self.state == CircuitState::Closed;
        self.state = CircuitState::Open;
        if tripped {
            tracing::warn!(
                consecutive_failures = self.consecutive_failures,
                threshold = self.threshold,
                "Circuit breaker opened"
            );
        }
        tripped
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn opened_at(&self) -> Option<Instant> {
        self.opened_at
    }
}
