//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, apply PORT override)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → DispatchConfig handed to the Dispatcher at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a dispatcher keeps its policy for its lifetime
//! - All fields have defaults to allow minimal configs (or none at all)
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    DispatchConfig, ObservabilityConfig, ProviderConfig, ProvidersConfig, ServerConfig,
    ServiceConfig,
};
pub use validation::ValidationError;
