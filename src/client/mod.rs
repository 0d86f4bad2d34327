//! Backend API client.
//!
//! # Data Flow
//! ```text
//! Caller → api.rs ApiClient::execute(operation)
//!     → connection::state: Connected? use the active endpoint
//!     → otherwise health::prober discovery (one shared sweep)
//!     → executor.rs sends with the request deadline
//!     → outcome.rs RequestOutcome
//!         Success                     → streak reset, telemetry
//!         NetworkFailure / Timeout    → demote, arm reconnect
//!         ParseFailure / Application  → surfaced, state untouched
//! ```
//!
//! # Design Decisions
//! - Outcomes are classified from what the transport reported, not from
//!   error text
//! - Shapes in types.rs mirror the backend's JSON and are not negotiated

pub mod api;
pub mod executor;
pub mod operation;
pub mod outcome;
pub mod types;

pub use api::{ApiClient, ClientError, ClientStatus};
pub use executor::{Exchange, RequestExecutor, REQUEST_ID_HEADER};
pub use operation::Operation;
pub use outcome::{RequestError, RequestOutcome};
pub use types::{
    HealthReport, HealthStatus, MutationResult, MutationTestResult, TestCustomRequest,
    TestDetail, TestGithubRequest,
};
