//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatch attempt:
//!     → circuit_breaker.rs (fail fast while providers are known to be down)
//!     → rate_limit.rs (sliding 60s window of attempts)
//!     → retries.rs (rounds of primary + fallback)
//!         → timeouts.rs (optional deadline per provider call)
//!         → backoff.rs (exponential delay between rounds)
//!     → On exhaustion: circuit_breaker.rs counts the failure
//! ```
//!
//! # Design Decisions
//! - Breaker and limiter are plain state machines; the dispatcher owns and locks them
//! - Policy rejections defer the message, they are never errors
//! - Backoff numerics are exact unless jitter is configured

pub mod backoff;
pub mod circuit_breaker;
pub mod rate_limit;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{BreakerDecision, CircuitBreaker, CircuitState};
pub use rate_limit::SlidingWindowLimiter;
pub use retries::{RetryFallbackExecutor, RetryPolicy};
