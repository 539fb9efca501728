//! Retry and fallback across the provider pair.
//!
//! # Responsibilities
//! - Run up to `max_retries` rounds of primary-then-secondary
//! - Fall back to the secondary immediately, within the same round
//! - Back off exponentially between rounds
//! - Report `SENT` / `RETRYING` transitions to the caller as they happen
//!
//! # Design Decisions
//! - The executor owns no shared state; the dispatcher decides what a failure means
//! - The backoff sleep follows every failed round, including the last one
//! - Sleeping goes through the injected `Clock`, never a blocking call

use std::sync::Arc;
use std::time::Duration;

use crate::dispatch::clock::Clock;
use crate::dispatch::{labels, DispatchStatus, Message};
use crate::error::ExecutorError;
use crate::observability::metrics;
use crate::providers::{Provider, ProviderPair};
use crate::resilience::backoff::backoff_delay;
use crate::resilience::timeouts::call_with_timeout;

/// Tunables for one executor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub jitter_ratio: f64,
    pub call_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff_ms: 1000,
            max_backoff_ms: 60_000,
            jitter_ratio: 0.0,
            call_timeout: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryFallbackExecutor {
    providers: ProviderPair,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl RetryFallbackExecutor {
    pub fn new(providers: ProviderPair, policy: RetryPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            providers,
            policy,
            clock,
        }
    }

    /// Deliver `message`, returning the label of the provider that accepted it.
    ///
    /// `report` is called with `(status, label)` for every `SENT` and `RETRYING`
    /// transition, in order.
    pub async fn execute<F>(&self, message: &Message, report: F) -> Result<String, ExecutorError>
    where
        F: Fn(DispatchStatus, String) + Send + Sync,
    {
        for round in 0..self.policy.max_retries {
            for provider in [&self.providers.primary, &self.providers.secondary] {
                if self.attempt(provider.as_ref(), message, round).await {
                    let label = provider.name().to_string();
                    report(DispatchStatus::Sent, label.clone());
                    return Ok(label);
                }
            }

            report(DispatchStatus::Retrying, labels::attempt(round));
            let delay = backoff_delay(
                round,
                self.policy.base_backoff_ms,
                self.policy.max_backoff_ms,
                self.policy.jitter_ratio,
            );
            tracing::info!(
                message_id = %message.id,
                round = round + 1,
                delay_ms = delay.as_millis() as u64,
                "Both providers failed, backing off"
            );
            self.clock.sleep(delay).await;
        }

        Err(ExecutorError::AllProvidersExhausted {
            rounds: self.policy.max_retries,
        })
    }

    async fn attempt(&self, provider: &dyn Provider, message: &Message, round: u32) -> bool {
        match call_with_timeout(provider, message, self.policy.call_timeout).await {
            Ok(()) => {
                metrics::record_provider_attempt(provider.name(), true);
                true
            }
            Err(e) => {
                metrics::record_provider_attempt(provider.name(), false);
                tracing::debug!(
                    message_id = %message.id,
                    round = round + 1,
                    error = %e,
                    "Provider attempt failed"
                );
                false
            }
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::clock::ManualClock;
    use crate::providers::MockProvider;
    use parking_lot::Mutex;

    fn message() -> Message {
        Message::new("r1", "test@example.com", "Test", "body")
    }

    fn executor(
        primary: Arc<MockProvider>,
        secondary: Arc<MockProvider>,
        clock: ManualClock,
    ) -> RetryFallbackExecutor {
        RetryFallbackExecutor::new(
            ProviderPair::new(primary, secondary),
            RetryPolicy::default(),
            Arc::new(clock),
        )
    }

    #[tokio::test]
    async fn test_primary_success_skips_secondary() {
        let primary = Arc::new(MockProvider::always_ok("ProviderA"));
        let secondary = Arc::new(MockProvider::always_ok("ProviderB"));
        let exec = executor(primary.clone(), secondary.clone(), ManualClock::new());

        let events = Mutex::new(Vec::new());
        let label = exec
            .execute(&message(), |status, label| events.lock().push((status, label)))
            .await
            .unwrap();

        assert_eq!(label, "ProviderA");
        assert_eq!(secondary.calls(), 0);
        assert_eq!(events.into_inner(), vec![(DispatchStatus::Sent, "ProviderA".to_string())]);
    }

    #[tokio::test]
    async fn test_fallback_within_same_round() {
        let clock = ManualClock::new();
        let primary = Arc::new(MockProvider::always_fail("ProviderA"));
        let secondary = Arc::new(MockProvider::always_ok("ProviderB"));
        let exec = executor(primary.clone(), secondary.clone(), clock.clone());

        let label = exec.execute(&message(), |_, _| {}).await.unwrap();

        assert_eq!(label, "ProviderB");
        assert_eq!(primary.calls(), 1);
        assert!(clock.sleeps().is_empty(), "no backoff between primary and fallback");
    }

    #[tokio::test]
    async fn test_exhaustion_backs_off_exponentially() {
        let clock = ManualClock::new();
        let primary = Arc::new(MockProvider::always_fail("ProviderA"));
        let secondary = Arc::new(MockProvider::always_fail("ProviderB"));
        let exec = executor(primary.clone(), secondary.clone(), clock.clone());

        let events = Mutex::new(Vec::new());
        let err = exec
            .execute(&message(), |status, label| events.lock().push((status, label)))
            .await
            .unwrap_err();

        assert_eq!(err, ExecutorError::AllProvidersExhausted { rounds: 3 });
        assert_eq!(primary.calls(), 3);
        assert_eq!(secondary.calls(), 3);
        assert_eq!(
            clock.sleeps(),
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(4000),
            ]
        );
        let labels: Vec<String> = events.into_inner().into_iter().map(|(_, l)| l).collect();
        assert_eq!(labels, vec!["Attempt 1", "Attempt 2", "Attempt 3"]);
    }
}
