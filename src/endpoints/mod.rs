//! Endpoint discovery inputs.
//!
//! # Data Flow
//! ```text
//! ExecutionContext (hostname, origin)
//!     → registry.rs (ordered candidate list, computed once per client)
//!     → health::prober scans the list in order
//! ```

pub mod context;
pub mod registry;

pub use context::ExecutionContext;
pub use registry::{api_url, EndpointCandidate, EndpointRegistry, OriginKind};
