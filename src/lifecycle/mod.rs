//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build dispatcher → Start drainer/metrics → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Stop drainer → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then the dispatcher, then listeners
//! - Queued messages are not persisted; shutdown drops them

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
