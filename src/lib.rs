//! Resilient connectivity layer for the TestForge mutation-testing backend.

pub mod config;
pub mod endpoints;
pub mod health;
pub mod connection;
pub mod resilience;
pub mod client;
pub mod observability;
pub mod lifecycle;

pub use client::{ApiClient, RequestOutcome};
pub use config::schema::ClientConfig;
pub use connection::ConnectionState;
pub use endpoints::{EndpointCandidate, ExecutionContext};
pub use lifecycle::Shutdown;
