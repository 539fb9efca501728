//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, probabilities in [0, 1])
//! - Check the provider pair is distinguishable in the status log
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before a dispatcher is constructed; an invalid config is fatal

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{DispatchConfig, ServiceConfig};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = dispatch_errors(&config.dispatch);

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("server.bind_address", "not a socket address"));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be positive"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "not a socket address"));
    }

    let providers = &config.providers;
    for (field, provider) in [
        ("providers.primary", &providers.primary),
        ("providers.secondary", &providers.secondary),
    ] {
        if provider.name.trim().is_empty() {
            errors.push(ValidationError::new(field, "name must not be empty"));
        }
        if !(0.0..=1.0).contains(&provider.success_rate) {
            errors.push(ValidationError::new(field, "success_rate must be within [0, 1]"));
        }
    }
    if providers.primary.name == providers.secondary.name {
        errors.push(ValidationError::new("providers", "primary and secondary need distinct names"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks for the dispatch policy alone; also applied when a dispatcher is built directly.
pub fn validate_dispatch(config: &DispatchConfig) -> Result<(), Vec<ValidationError>> {
    let errors = dispatch_errors(config);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn dispatch_errors(config: &DispatchConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.rate_limit_per_minute == 0 {
        errors.push(ValidationError::new("dispatch.rate_limit_per_minute", "must be positive"));
    }
    if config.breaker_threshold == 0 {
        errors.push(ValidationError::new("dispatch.breaker_threshold", "must be at least 1"));
    }
    if config.max_retries == 0 {
        errors.push(ValidationError::new("dispatch.max_retries", "must be at least 1"));
    }
    if config.max_backoff_ms < config.base_backoff_ms {
        errors.push(ValidationError::new(
            "dispatch.max_backoff_ms",
            "must not be smaller than base_backoff_ms",
        ));
    }
    if !(0.0..=1.0).contains(&config.backoff_jitter) {
        errors.push(ValidationError::new("dispatch.backoff_jitter", "must be within [0, 1]"));
    }
    if config.provider_timeout_ms == Some(0) {
        errors.push(ValidationError::new("dispatch.provider_timeout_ms", "must be positive when set"));
    }
    if config.max_deferrals == Some(0) {
        errors.push(ValidationError::new("dispatch.max_deferrals", "must be positive when set"));
    }

    errors
}
