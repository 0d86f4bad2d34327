//! Connectivity state and recovery.
//!
//! # Data Flow
//! ```text
//! health::prober success → state.rs: Probing → Connected
//! connectivity failure   → state.rs: Connected → Degraded
//!                        → scheduler.rs arms one delayed probe
//! host offline           → state.rs: → Disconnected, scheduler.rs paused
//! host online            → scheduler.rs probes after the settle delay
//! ```
//!
//! # Design Decisions
//! - The state machine is the single source of truth for which URL to use
//! - Only the prober promotes, only connectivity failures demote

pub mod scheduler;
pub mod state;

pub use scheduler::ReconnectScheduler;
pub use state::{ConnectionEvent, ConnectionState, ConnectionStateMachine, Phase};
