//! Simulated transport that succeeds with a fixed probability.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rand::Rng;

use crate::dispatch::Message;
use crate::error::ProviderError;
use crate::providers::Provider;

#[derive(Debug)]
pub struct MockProvider {
    name: String,
    success_rate: f64,
    calls: AtomicUsize,
}

impl MockProvider {
    /// `success_rate` is clamped to `[0.0, 1.0]`; a non-finite rate never succeeds.
    pub fn new(name: impl Into<String>, success_rate: f64) -> Self {
        let success_rate = if success_rate.is_finite() {
            success_rate.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            name: name.into(),
            success_rate,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always_ok(name: impl Into<String>) -> Self {
        Self::new(name, 1.0)
    }

    pub fn always_fail(name: impl Into<String>) -> Self {
        Self::new(name, 0.0)
    }

    /// Number of `send` calls observed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, message: &Message) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        if rand::thread_rng().gen_bool(self.success_rate) {
            tracing::debug!(provider = %self.name, message_id = %message.id, "Simulated send succeeded");
            Ok(())
        } else {
            Err(ProviderError::rejected(&self.name, "simulated transport failure"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> Message {
        Message::new("m1", "test@example.com", "Test", "body")
    }

    #[tokio::test]
    async fn test_deterministic_rates() {
        let ok = MockProvider::always_ok("ProviderA");
        let fail = MockProvider::always_fail("ProviderB");

        for _ in 0..20 {
            assert!(ok.send(&message()).await.is_ok());
            let err = fail.send(&message()).await.unwrap_err();
            assert_eq!(err.provider(), "ProviderB");
        }
        assert_eq!(ok.calls(), 20);
        assert_eq!(fail.calls(), 20);
    }

    #[test]
    fn test_rate_is_clamped() {
        let provider = MockProvider::new("p", 7.5);
        assert_eq!(provider.success_rate, 1.0);
        let provider = MockProvider::new("p", -1.0);
        assert_eq!(provider.success_rate, 0.0);
    }

    #[tokio::test]
    async fn test_non_finite_rate_fails_instead_of_panicking() {
        for rate in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let provider = MockProvider::new("p", rate);
            assert_eq!(provider.success_rate, 0.0);
            assert!(provider.send(&message()).await.is_err());
        }
    }
}
