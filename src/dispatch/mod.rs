//! Dispatch subsystem: the resilient core.
//!
//! # Data Flow
//! ```text
//! caller (HTTP handler, CLI demo, drainer)
//!     → dispatcher.rs send()
//!         → idempotency ledger
//!         → resilience::CircuitBreaker
//!         → resilience::SlidingWindowLimiter
//!         → resilience::RetryFallbackExecutor → providers
//!     → status.rs StatusSink (every event)
//!     → deferred queue on any non-delivery
//!
//! drainer.rs (optional, periodic) → process_queue() → send() per queued message
//! ```

pub mod clock;
pub mod dispatcher;
pub mod drainer;
pub mod message;
pub mod status;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use drainer::QueueDrainer;
pub use message::{
    labels, DeferReason, DispatchOutcome, DispatchStatus, DrainReport, Message, StatusEvent,
};
pub use status::{FanoutSink, StatusSink};
