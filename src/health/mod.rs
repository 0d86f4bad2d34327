//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Discovery (prober.rs):
//!     previously active endpoint → single probe (fast path)
//!     → otherwise scan eligible candidates in registry order
//!     → first 2xx + JSON body wins
//!
//! Failure bookkeeping (attempts.rs):
//!     probe failure → streak + 1
//!     probe success → streak = 0
//!     streak >= threshold → skipped, unless every candidate is over it
//!
//! Background monitor (monitor.rs):
//!     Periodic timer → ApiClient::check_health, skipped if one ran recently
//! ```

pub mod attempts;
pub mod monitor;
pub mod prober;

pub use attempts::{AttemptBook, AttemptRecord};
pub use monitor::HealthMonitor;
pub use prober::{HealthProber, ProbeError, ProbeFailure, ProbeSuccess};
