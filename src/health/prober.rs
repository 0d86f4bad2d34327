//! Endpoint discovery by liveness probing.
//!
//! # Responsibilities
//! - Re-validate the previously trusted endpoint first (fast path)
//! - Otherwise scan candidates in priority order with a short deadline each
//! - Maintain per-candidate failure streaks
//!
//! # Design Decisions
//! - A candidate is alive when it answers 2xx with a JSON health body
//! - Probe deadline is independent of (and much shorter than) the request deadline
//! - Fast-path failures do not count against the streak; the scan that
//!   follows retries the endpoint and counts there

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use thiserror::Error;

use crate::client::types::HealthStatus;
use crate::endpoints::EndpointCandidate;
use crate::health::attempts::AttemptBook;
use crate::observability::metrics;
use crate::resilience::with_deadline;

/// Why a single liveness probe failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    #[error("connection error: {0}")]
    Transport(String),

    #[error("timed out after {0}ms")]
    Timeout(u128),

    #[error("non-success status {0}")]
    Status(u16),

    #[error("unparseable health body: {0}")]
    Body(String),
}

/// Discovery sweep failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("Unable to connect to any API endpoint ({tried} tried). Please check if the server is running.")]
    AllEndpointsExhausted { tried: usize },
}

/// The endpoint that won a sweep and what it answered.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSuccess {
    pub candidate: EndpointCandidate,
    pub health: HealthStatus,
}

/// Issues liveness requests against candidates.
#[derive(Debug, Clone)]
pub struct HealthProber {
    http: reqwest::Client,
    health_path: String,
}

impl HealthProber {
    pub fn new(http: reqwest::Client, health_path: impl Into<String>) -> Self {
        Self {
            http,
            health_path: health_path.into(),
        }
    }

    /// One liveness request against one candidate.
    pub async fn check(
        &self,
        candidate: &EndpointCandidate,
        timeout: Duration,
    ) -> Result<HealthStatus, ProbeFailure> {
        let url = candidate.api_url(&self.health_path);

        let exchange = async {
            let response = self
                .http
                .get(&url)
                .header(ACCEPT, "application/json")
                .header(CONTENT_TYPE, "application/json")
                .send()
                .await
                .map_err(|e| ProbeFailure::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(ProbeFailure::Status(status.as_u16()));
            }
            response
                .json::<HealthStatus>()
                .await
                .map_err(|e| ProbeFailure::Body(e.to_string()))
        };

        match with_deadline(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(ProbeFailure::Timeout(timeout.as_millis())),
        }
    }

    /// Find a live candidate.
    ///
    /// `previous` is re-validated first; on success no other candidate is contacted.
    pub async fn probe(
        &self,
        candidates: &[EndpointCandidate],
        attempts: &AttemptBook,
        previous: Option<&EndpointCandidate>,
        timeout: Duration,
    ) -> Result<ProbeSuccess, ProbeError> {
        if let Some(previous) = previous {
            tracing::debug!(url = %previous, "Re-validating previously active endpoint");
            attempts.mark_tried(&previous.url);
            match self.check(previous, timeout).await {
                Ok(health) => {
                    attempts.record_success(&previous.url);
                    metrics::record_probe("ok");
                    tracing::debug!(url = %previous, "Previously active endpoint still healthy");
                    return Ok(ProbeSuccess {
                        candidate: previous.clone(),
                        health,
                    });
                }
                Err(e) => {
                    metrics::record_probe("failed");
                    tracing::info!(url = %previous, error = %e, "Previously active endpoint no longer healthy");
                }
            }
        }

        let eligible = attempts.eligible(candidates);
        for candidate in candidates.iter().filter(|c| !eligible.contains(c)) {
            metrics::record_probe("skipped");
            tracing::debug!(
                url = %candidate,
                failures = attempts.get(&candidate.url).consecutive_failures,
                "Skipping repeatedly failed endpoint"
            );
        }

        for candidate in &eligible {
            match self.check(candidate, timeout).await {
                Ok(health) => {
                    attempts.record_success(&candidate.url);
                    metrics::record_probe("ok");
                    tracing::info!(url = %candidate, status = %health.status, "Found working endpoint");
                    return Ok(ProbeSuccess {
                        candidate: candidate.clone(),
                        health,
                    });
                }
                Err(e) => {
                    let failures = attempts.record_failure(&candidate.url);
                    metrics::record_probe("failed");
                    tracing::warn!(url = %candidate, error = %e, failures, "Endpoint probe failed");
                }
            }
        }

        tracing::error!(tried = eligible.len(), "All endpoints failed, no working connection found");
        Err(ProbeError::AllEndpointsExhausted {
            tried: eligible.len(),
        })
    }
}
