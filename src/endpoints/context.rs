//! Execution context the client runs under.

use serde::{Deserialize, Serialize};

use crate::config::EndpointsConfig;

/// Hostname and origin of the process hosting the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub hostname: String,
    pub origin: Option<String>,
}

impl ExecutionContext {
    pub fn new(hostname: impl Into<String>, origin: Option<String>) -> Self {
        Self {
            hostname: hostname.into(),
            origin: origin
                .map(|o| o.trim_end_matches('/').to_string())
                .filter(|o| !o.is_empty()),
        }
    }

    /// Build the context from the `[endpoints]` section.
    pub fn from_config(config: &EndpointsConfig) -> Self {
        Self::new(config.hostname.clone(), config.origin.clone())
    }

    /// True when running on the developer's machine.
    pub fn is_local(&self) -> bool {
        matches!(self.hostname.as_str(), "localhost" | "127.0.0.1")
    }
}
