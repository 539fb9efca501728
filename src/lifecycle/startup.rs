//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the dispatcher from validated configuration
//! - Start background tasks (queue drainer, metrics exporter)
//!
//! # Design Decisions
//! - Fail fast: an invalid configuration is fatal
//! - Background tasks subscribe to the shared `Shutdown` before the server starts

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::validation::validate_config;
use crate::config::{ConfigError, ServiceConfig};
use crate::dispatch::{Dispatcher, QueueDrainer};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::providers::ProviderPair;

pub fn build_dispatcher(config: &ServiceConfig) -> Result<Arc<Dispatcher>, ConfigError> {
    validate_config(config).map_err(ConfigError::Validation)?;

    let providers = ProviderPair::from_config(&config.providers);
    tracing::info!(
        primary = %config.providers.primary.name,
        secondary = %config.providers.secondary.name,
        rate_limit_per_minute = config.dispatch.rate_limit_per_minute,
        "Building dispatcher"
    );

    Ok(Arc::new(Dispatcher::new(config.dispatch.clone(), providers)?))
}

/// Start the metrics exporter and the queue drainer. Returns the drainer task, if any.
pub fn spawn_background(
    config: &ServiceConfig,
    dispatcher: Arc<Dispatcher>,
    shutdown: &Shutdown,
) -> Option<JoinHandle<()>> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    if config.dispatch.drain_interval_secs == 0 {
        return None;
    }

    let drainer = QueueDrainer::new(
        dispatcher,
        Duration::from_secs(config.dispatch.drain_interval_secs),
    );
    Some(tokio::spawn(drainer.run(shutdown.subscribe())))
}
