//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, backoff growth >= 1)
//! - Check explicit endpoint candidates parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ClientConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("timeouts.probe_ms ({probe_ms}) must be shorter than timeouts.request_ms ({request_ms})")]
    ProbeNotShorter { probe_ms: u64, request_ms: u64 },

    #[error("reconnect.multiplier must be a finite number >= 1.0, got {0}")]
    Multiplier(f64),

    #[error("reconnect.base_delay_ms ({base}) exceeds reconnect.max_delay_ms ({max})")]
    BaseAboveMax { base: u64, max: u64 },

    #[error("invalid endpoint candidate '{0}'")]
    Candidate(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("unknown log format '{0}' (expected \"pretty\" or \"json\")")]
    LogFormat(String),
}

/// Check a configuration, collecting every violation.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let timeouts = &config.timeouts;
    if timeouts.request_ms == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.request_ms" });
    }
    if timeouts.probe_ms == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.probe_ms" });
    }
    if timeouts.probe_ms > 0 && timeouts.request_ms > 0 && timeouts.probe_ms >= timeouts.request_ms {
        errors.push(ValidationError::ProbeNotShorter {
            probe_ms: timeouts.probe_ms,
            request_ms: timeouts.request_ms,
        });
    }

    if config.probe.failure_threshold == 0 {
        errors.push(ValidationError::Zero { field: "probe.failure_threshold" });
    }

    let reconnect = &config.reconnect;
    if !reconnect.multiplier.is_finite() || reconnect.multiplier < 1.0 {
        errors.push(ValidationError::Multiplier(reconnect.multiplier));
    }
    if reconnect.base_delay_ms == 0 {
        errors.push(ValidationError::Zero { field: "reconnect.base_delay_ms" });
    }
    if reconnect.base_delay_ms > reconnect.max_delay_ms {
        errors.push(ValidationError::BaseAboveMax {
            base: reconnect.base_delay_ms,
            max: reconnect.max_delay_ms,
        });
    }

    if config.health_check.enabled && config.health_check.interval_secs == 0 {
        errors.push(ValidationError::Zero { field: "health_check.interval_secs" });
    }

    for candidate in &config.endpoints.candidates {
        let relative = candidate.starts_with('/');
        if !relative && Url::parse(candidate).is_err() {
            errors.push(ValidationError::Candidate(candidate.clone()));
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }
    if !matches!(observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::LogFormat(observability.log_format.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
