//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Prober, state machine, scheduler, executor produce:
//!     → tracing events (structured fields, request IDs)
//!     → telemetry.rs (snapshot the host UI reads)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → logging.rs subscriber (stderr, pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//!     → ApiClient::telemetry()
//! ```
//!
//! # Design Decisions
//! - Telemetry is observed, never consulted for control decisions
//! - Metrics are no-ops unless the binary installs a recorder

pub mod logging;
pub mod metrics;
pub mod telemetry;

pub use telemetry::{TelemetrySink, TelemetrySnapshot};
