//! Resilience primitives.
//!
//! # Data Flow
//! ```text
//! Probe or request to backend:
//!     → timeouts.rs (enforce probe/request deadline)
//!     → On connectivity failure: connection::scheduler arms a reconnect
//!       delayed by backoff.rs
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Backoff is deterministic and bounded; only one reconnect is ever pending

pub mod backoff;
pub mod timeouts;

pub use backoff::reconnect_delay;
pub use timeouts::{with_deadline, DeadlineExceeded};
