//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher produces:
//!     → StatusSink (logging.rs TracingSink: one line per status event)
//!     → metrics.rs (event counters, queue depth, breaker state)
//!
//! Consumers:
//!     → stdout log lines
//!     → Prometheus scrape endpoint (optional)
//!     → GET /status-log (the in-memory event log itself)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every log line (message_id, status, provider)
//! - Metrics are cheap no-ops until an exporter is installed

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, TracingSink};
