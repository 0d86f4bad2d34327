//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the API connectivity client.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Candidate endpoint construction.
    pub endpoints: EndpointsConfig,

    /// Request and probe deadlines.
    pub timeouts: TimeoutConfig,

    /// Endpoint discovery settings.
    pub probe: ProbeConfig,

    /// Automatic reconnection backoff.
    pub reconnect: ReconnectConfig,

    /// Periodic background health check.
    pub health_check: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Endpoint candidate configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Hostname the client runs under (e.g., "localhost").
    pub hostname: String,

    /// Origin the client runs under (e.g., "http://localhost:3000").
    pub origin: Option<String>,

    /// LAN address observed for the development backend.
    pub network_ip: String,

    /// Primary local backend port.
    pub local_port: u16,

    /// Alternate local backend port.
    pub alternate_port: u16,

    /// Port of the local dev server that proxies `/api`.
    pub dev_server_port: u16,

    /// Dedicated production API domain, tried last.
    pub production_api_url: String,

    /// Explicit candidate list. Replaces the computed list when non-empty.
    pub candidates: Vec<String>,

    /// Route requests through the proxy named by `HTTP(S)_PROXY`.
    pub use_system_proxy: bool,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            origin: None,
            network_ip: "172.20.10.5".to_string(),
            local_port: 5000,
            alternate_port: 8000,
            dev_server_port: 3001,
            production_api_url: "https://api.testforge.app".to_string(),
            candidates: Vec::new(),
            use_system_proxy: true,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Overall deadline for a data-bearing request in milliseconds.
    pub request_ms: u64,

    /// Deadline for a single liveness probe in milliseconds.
    pub probe_ms: u64,
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }

    pub fn probe(&self) -> Duration {
        Duration::from_millis(self.probe_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_ms: 60_000,
            probe_ms: 5_000,
        }
    }
}

/// Endpoint discovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ProbeConfig {
    /// Consecutive failures after which a candidate is skipped in scans.
    pub failure_threshold: u32,

    /// Health path, appended after the `/api` prefix.
    pub health_path: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            health_path: "/health".to_string(),
        }
    }
}

/// Reconnect backoff configuration.
///
/// `delay = min(base_delay * multiplier^min(attempt, cap_index), max_delay)`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Delay before the first reconnect attempt in milliseconds.
    pub base_delay_ms: u64,

    /// Growth factor per failed attempt.
    pub multiplier: f64,

    /// Exponent cap.
    pub cap_index: u32,

    /// Upper bound for any delay in milliseconds.
    pub max_delay_ms: u64,

    /// Delay between the host coming back online and the recovery probe.
    pub online_settle_ms: u64,

    /// Failed reconnect probes tolerated in `Degraded` before falling to `Disconnected`.
    pub degraded_attempts: u32,
}

impl ReconnectConfig {
    pub fn online_settle(&self) -> Duration {
        Duration::from_millis(self.online_settle_ms)
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 5_000,
            multiplier: 1.5,
            cap_index: 5,
            max_delay_ms: 30_000,
            online_settle_ms: 2_000,
            degraded_attempts: 5,
        }
    }
}

/// Periodic health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable the background health monitor.
    pub enabled: bool,

    /// Monitor tick interval in seconds.
    pub interval_secs: u64,

    /// Skip a tick if any health check ran within this many seconds.
    pub min_gap_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
            min_gap_secs: 45,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9464".to_string(),
        }
    }
}
