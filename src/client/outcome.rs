//! Typed request outcomes.
//!
//! Classification is structural: the executor decides the variant from what
//! the transport reported, never from error message text.

use thiserror::Error;

/// Result of one logical request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome<T> {
    Success(T),
    /// No response: connection refused, DNS failure, TLS or CORS rejection.
    NetworkFailure(String),
    /// The request deadline elapsed and the exchange was cancelled.
    Timeout,
    /// A response arrived but its body was not the expected JSON.
    ParseFailure(String),
    /// A reachable server answered with a well-formed error.
    ApplicationError(String),
    /// No endpoint could be discovered to send the request to.
    AllEndpointsExhausted,
}

impl<T> RequestOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Success(_))
    }

    /// Failures attributable to the network rather than the backend's logic.
    pub fn is_connectivity_failure(&self) -> bool {
        matches!(
            self,
            RequestOutcome::NetworkFailure(_)
                | RequestOutcome::Timeout
                | RequestOutcome::AllEndpointsExhausted
        )
    }

    /// Label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestOutcome::Success(_) => "success",
            RequestOutcome::NetworkFailure(_) => "network_failure",
            RequestOutcome::Timeout => "timeout",
            RequestOutcome::ParseFailure(_) => "parse_failure",
            RequestOutcome::ApplicationError(_) => "application_error",
            RequestOutcome::AllEndpointsExhausted => "endpoints_exhausted",
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RequestOutcome<U> {
        match self {
            RequestOutcome::Success(value) => RequestOutcome::Success(f(value)),
            RequestOutcome::NetworkFailure(d) => RequestOutcome::NetworkFailure(d),
            RequestOutcome::Timeout => RequestOutcome::Timeout,
            RequestOutcome::ParseFailure(d) => RequestOutcome::ParseFailure(d),
            RequestOutcome::ApplicationError(m) => RequestOutcome::ApplicationError(m),
            RequestOutcome::AllEndpointsExhausted => RequestOutcome::AllEndpointsExhausted,
        }
    }

    /// Message suitable for showing to a person. `None` on success.
    pub fn user_message(&self) -> Option<String> {
        self.error().map(|e| e.to_string())
    }

    /// The failure as an error value. `None` on success.
    pub fn error(&self) -> Option<RequestError> {
        match self {
            RequestOutcome::Success(_) => None,
            RequestOutcome::NetworkFailure(d) => Some(RequestError::Network(d.clone())),
            RequestOutcome::Timeout => Some(RequestError::Timeout),
            RequestOutcome::ParseFailure(d) => Some(RequestError::Parse(d.clone())),
            RequestOutcome::ApplicationError(m) => Some(RequestError::Application(m.clone())),
            RequestOutcome::AllEndpointsExhausted => Some(RequestError::Exhausted),
        }
    }

    pub fn into_result(self) -> Result<T, RequestError> {
        match self {
            RequestOutcome::Success(value) => Ok(value),
            other => Err(other.error().unwrap_or(RequestError::Exhausted)),
        }
    }
}

/// Failure half of a [`RequestOutcome`], for `?`-style callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Cannot connect to the server. The application is trying alternative connection methods. Please check if the backend service is running.")]
    Network(String),

    #[error("Request timeout. The server took too long to respond. Please try again or try with simpler code.")]
    Timeout,

    #[error("The server returned malformed data.")]
    Parse(String),

    #[error("{0}")]
    Application(String),

    #[error("Unable to connect to any API endpoint. Please check if the server is running.")]
    Exhausted,
}

impl RequestError {
    /// Transport or parser detail behind the user-facing message.
    pub fn detail(&self) -> Option<&str> {
        match self {
            RequestError::Network(d) | RequestError::Parse(d) => Some(d),
            _ => None,
        }
    }
}
