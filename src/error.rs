//! Error types for dispatch operations.
//!
//! Provider and executor failures are recoverable: the dispatcher absorbs them
//! into the deferred queue and never returns them to the caller of `send`.
//! Policy rejections (open breaker, rate limit) are not errors at all; they are
//! reported as `DispatchOutcome::Deferred`.

use thiserror::Error;

/// A single provider call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("{provider} rejected message: {reason}")]
    Rejected { provider: String, reason: String },

    #[error("{provider} timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },
}

impl ProviderError {
    pub fn rejected(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    pub fn provider(&self) -> &str {
        match self {
            Self::Rejected { provider, .. } | Self::Timeout { provider, .. } => provider,
        }
    }
}

/// The retry/fallback executor gave up on a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    #[error("all providers failed after {rounds} rounds")]
    AllProvidersExhausted { rounds: u32 },
}
