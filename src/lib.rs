//! Resilient mail dispatch library.
//!
//! At-most-once delivery per message id over two unreliable providers, with a
//! sliding-window rate limit, a failure-counting circuit breaker, retry with
//! fallback and exponential backoff, and a deferred queue for everything that
//! could not be delivered yet.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod providers;
pub mod resilience;

pub use config::schema::ServiceConfig;
pub use dispatch::{DispatchOutcome, DispatchStatus, Dispatcher, Message, StatusEvent};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use providers::{Provider, ProviderPair};
