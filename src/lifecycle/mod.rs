//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Environment (environment.rs):
//!     Host reports online/offline → ApiClient pauses or resumes reconnection
//!
//! Timers (task.rs):
//!     Every delayed or background job is a ScheduledTask; drop = cancel
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     Ctrl-C / SIGTERM → broadcast → monitor and reload loops exit
//! ```

pub mod environment;
pub mod shutdown;
pub mod signals;
pub mod task;

pub use environment::{Environment, EnvironmentObserver, EnvironmentSignal};
pub use shutdown::Shutdown;
pub use task::ScheduledTask;
