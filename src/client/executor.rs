//! Single-request execution and outcome classification.
//!
//! # Responsibilities
//! - Build the request for an operation against a base URL
//! - Bound the whole exchange (headers and body) by the request deadline
//! - Translate what happened into a [`RequestOutcome`]
//!
//! # Classification
//! ```text
//! send() error                       → NetworkFailure
//! deadline elapsed                   → Timeout (exchange dropped)
//! body not JSON                      → ParseFailure
//! non-2xx with JSON body             → ApplicationError(body.error | body.message | status line)
//! 2xx JSON not matching the type     → ParseFailure
//! 2xx JSON                           → Success
//! ```

use std::time::{Duration, Instant};

use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::client::operation::Operation;
use crate::client::outcome::RequestOutcome;
use crate::endpoints::EndpointCandidate;
use crate::observability::telemetry::error_chain;
use crate::resilience::with_deadline;

/// Header carrying the per-request correlation ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// One finished exchange.
#[derive(Debug)]
pub struct Exchange<T> {
    pub outcome: RequestOutcome<T>,
    pub elapsed: Duration,
    pub request_id: Uuid,
}

/// Sends one request and classifies the result.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    http: reqwest::Client,
}

impl RequestExecutor {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    pub async fn send<T>(
        &self,
        endpoint: &EndpointCandidate,
        operation: &Operation,
        timeout: Duration,
    ) -> Exchange<T>
    where
        T: DeserializeOwned,
    {
        let request_id = Uuid::new_v4();
        let url = endpoint.api_url(&operation.path());
        let started = Instant::now();

        tracing::debug!(
            request_id = %request_id,
            operation = operation.name(),
            url = %url,
            "Sending request"
        );

        let mut request = self
            .http
            .request(operation.method(), &url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            request = request.header(REQUEST_ID_HEADER, value);
        }
        if let Some(body) = operation.body() {
            request = request.json(&body);
        }

        let exchange = async move {
            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => return RequestOutcome::NetworkFailure(error_chain(&e)),
            };
            let status = response.status();
            let bytes = match response.bytes().await {
                Ok(bytes) => bytes,
                Err(e) => return RequestOutcome::NetworkFailure(error_chain(&e)),
            };
            classify(status, &bytes)
        };

        let outcome = match with_deadline(timeout, exchange).await {
            Ok(outcome) => outcome,
            Err(_) => RequestOutcome::Timeout,
        };

        Exchange {
            outcome,
            elapsed: started.elapsed(),
            request_id,
        }
    }
}

/// Classify a received response.
pub fn classify<T>(status: StatusCode, body: &[u8]) -> RequestOutcome<T>
where
    T: DeserializeOwned,
{
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            let excerpt: String = String::from_utf8_lossy(body).chars().take(200).collect();
            return RequestOutcome::ParseFailure(format!(
                "Failed to parse response as JSON ({e}): {excerpt}"
            ));
        }
    };

    if !status.is_success() {
        return RequestOutcome::ApplicationError(error_message(status, &value));
    }

    match serde_json::from_value(value) {
        Ok(payload) => RequestOutcome::Success(payload),
        Err(e) => RequestOutcome::ParseFailure(format!("Unexpected response shape: {e}")),
    }
}

fn error_message(status: StatusCode, body: &Value) -> String {
    ["error", "message"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .find(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!(
                "Error: {} - {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::types::MutationTestResult;

    #[test]
    fn test_success() {
        let outcome: RequestOutcome<MutationTestResult> = classify(
            StatusCode::OK,
            br#"{"total_mutations":1,"tests_passed_original":1,"tests_detected_mutations":1,"mutation_detection_rate":100.0}"#,
        );
        match outcome {
            RequestOutcome::Success(result) => assert_eq!(result.total_mutations, 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_error_field_preferred() {
        let outcome: RequestOutcome<Value> = classify(
            StatusCode::BAD_REQUEST,
            br#"{"error":"Repository URL is required","message":"ignored"}"#,
        );
        assert_eq!(
            outcome,
            RequestOutcome::ApplicationError("Repository URL is required".into())
        );
    }

    #[test]
    fn test_status_line_fallback() {
        let outcome: RequestOutcome<Value> = classify(StatusCode::INTERNAL_SERVER_ERROR, b"{}");
        assert_eq!(
            outcome,
            RequestOutcome::ApplicationError("Error: 500 - Internal Server Error".into())
        );
    }

    #[test]
    fn test_non_json_is_parse_failure_even_on_error_status() {
        let outcome: RequestOutcome<Value> = classify(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>");
        assert!(matches!(outcome, RequestOutcome::ParseFailure(d) if d.contains("<html>")));
    }

    #[test]
    fn test_wrong_shape_is_parse_failure() {
        let outcome: RequestOutcome<MutationTestResult> = classify(StatusCode::OK, br#"{"status":"ok"}"#);
        assert!(matches!(outcome, RequestOutcome::ParseFailure(_)));
    }
}
