//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → handed to ApiClient at construction
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → ApiClient::apply_config swaps the tunables
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Endpoint candidates are fixed for a client's lifetime; reload only
//!   touches timeouts, backoff and health-check settings

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ClientConfig, EndpointsConfig, HealthCheckConfig, ObservabilityConfig, ProbeConfig,
    ReconnectConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
