//! HTTP entry point.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → handlers.rs (JSON in/out)
//!     → Dispatcher (shared via Arc)
//! ```
//!
//! The HTTP layer only forwards requests; every policy decision lives in `dispatch`.

pub mod handlers;
pub mod server;

pub use server::{build_router, AppState, HttpServer};
