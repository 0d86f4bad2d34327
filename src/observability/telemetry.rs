//! Connectivity telemetry.
//!
//! # Responsibilities
//! - Count connection attempts, failures and reconnects
//! - Keep the last error, last response time and active endpoint
//!
//! # Design Decisions
//! - Append/overwrite only; nothing in the client reads it to make decisions
//! - Every write is mirrored to the `metrics` facade

use std::error::Error;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::observability::metrics;

/// Point-in-time copy of the telemetry record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub connection_attempts: u64,
    pub failed_attempts: u64,
    /// Reconnect probes fired by the scheduler.
    pub restart_attempts: u64,
    /// Unix milliseconds of the last health check or request.
    pub last_checked: Option<u64>,
    pub last_success_at: Option<u64>,
    pub last_error_at: Option<u64>,
    pub last_error_message: Option<String>,
    /// Source chain of the last error, outermost first.
    pub last_error_stack: Option<String>,
    pub last_response_time_ms: Option<f64>,
    pub active_endpoint: Option<String>,
    pub online: bool,
}

/// Shared, append-only telemetry record.
#[derive(Debug)]
pub struct TelemetrySink {
    inner: Mutex<TelemetrySnapshot>,
}

impl TelemetrySink {
    pub fn new(online: bool) -> Self {
        Self {
            inner: Mutex::new(TelemetrySnapshot {
                online,
                ..TelemetrySnapshot::default()
            }),
        }
    }

    fn update(&self, f: impl FnOnce(&mut TelemetrySnapshot)) {
        let mut snapshot = self.inner.lock().expect("telemetry mutex poisoned");
        f(&mut snapshot);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.inner.lock().expect("telemetry mutex poisoned").clone()
    }

    /// A discovery sweep or health check started.
    pub fn record_attempt(&self) {
        let now = unix_millis();
        self.update(|s| {
            s.connection_attempts += 1;
            s.last_checked = Some(now);
        });
    }

    /// The reconnect scheduler fired a probe.
    pub fn record_restart(&self) {
        self.update(|s| s.restart_attempts += 1);
    }

    pub fn record_success(&self, endpoint: &str, elapsed: Duration) {
        let now = unix_millis();
        self.update(|s| {
            s.last_checked = Some(now);
            s.last_success_at = Some(now);
            s.last_response_time_ms = Some(elapsed.as_secs_f64() * 1000.0);
            s.active_endpoint = Some(endpoint.to_string());
        });
    }

    pub fn record_failure(&self, message: &str, stack: Option<String>, elapsed: Option<Duration>) {
        let now = unix_millis();
        self.update(|s| {
            s.failed_attempts += 1;
            s.last_checked = Some(now);
            s.last_error_at = Some(now);
            s.last_error_message = Some(message.to_string());
            s.last_error_stack = stack;
            if let Some(elapsed) = elapsed {
                s.last_response_time_ms = Some(elapsed.as_secs_f64() * 1000.0);
            }
        });
        metrics::record_failure();
    }

    /// Record an error that is not a failed attempt (e.g. a host resource failure).
    pub fn record_error(&self, message: &str) {
        let now = unix_millis();
        self.update(|s| {
            s.last_error_at = Some(now);
            s.last_error_message = Some(message.to_string());
            s.last_error_stack = None;
        });
    }

    pub fn set_active_endpoint(&self, endpoint: Option<&str>) {
        self.update(|s| s.active_endpoint = endpoint.map(str::to_string));
    }

    pub fn set_online(&self, online: bool) {
        self.update(|s| s.online = online);
    }
}

/// Render an error and its `source()` chain, one cause per line.
pub fn error_chain(err: &(dyn Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\n  caused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_overwrite() {
        let sink = TelemetrySink::new(true);
        sink.record_attempt();
        sink.record_attempt();
        sink.record_failure("first", None, None);
        sink.record_failure("second", Some("second\n  caused by: io".into()), Some(Duration::from_millis(12)));
        sink.record_success("http://y", Duration::from_millis(40));

        let snap = sink.snapshot();
        assert_eq!(snap.connection_attempts, 2);
        assert_eq!(snap.failed_attempts, 2);
        assert_eq!(snap.last_error_message.as_deref(), Some("second"));
        assert!(snap.last_error_stack.unwrap().contains("caused by"));
        assert_eq!(snap.last_response_time_ms, Some(40.0));
        assert_eq!(snap.active_endpoint.as_deref(), Some("http://y"));
        assert!(snap.last_checked.is_some());
        assert!(snap.online);
    }

    #[test]
    fn test_error_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let wrapped = crate::config::ConfigError::Io(io);
        assert_eq!(error_chain(&wrapped), "IO error: refused\n  caused by: refused");
    }
}
