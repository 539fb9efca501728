//! Transport providers.
//!
//! # Data Flow
//! ```text
//! RetryFallbackExecutor
//!     → primary.send(message)
//!     → on failure: secondary.send(message) (same round)
//! ```
//!
//! # Design Decisions
//! - The dispatcher depends only on the `Provider` capability, never on a concrete transport
//! - `name()` is copied verbatim into `StatusEvent::provider` for `SENT` events
//! - Providers are stateless from the dispatcher's point of view and shared via `Arc`

pub mod mock;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ProvidersConfig;
use crate::dispatch::Message;
use crate::error::ProviderError;

pub use mock::MockProvider;

/// A transport able to deliver a message.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, message: &Message) -> Result<(), ProviderError>;
}

/// The two providers tried in every retry round, in order.
#[derive(Clone)]
pub struct ProviderPair {
    pub primary: Arc<dyn Provider>,
    pub secondary: Arc<dyn Provider>,
}

impl ProviderPair {
    pub fn new(primary: Arc<dyn Provider>, secondary: Arc<dyn Provider>) -> Self {
        Self { primary, secondary }
    }

    /// Build the simulated providers described by the configuration.
    pub fn from_config(config: &ProvidersConfig) -> Self {
        Self {
            primary: Arc::new(MockProvider::new(
                config.primary.name.clone(),
                config.primary.success_rate,
            )),
            secondary: Arc::new(MockProvider::new(
                config.secondary.name.clone(),
                config.secondary.success_rate,
            )),
        }
    }
}

impl std::fmt::Debug for ProviderPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderPair")
            .field("primary", &self.primary.name())
            .field("secondary", &self.secondary.name())
            .finish()
    }
}
