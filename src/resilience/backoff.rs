//! Bounded exponential backoff for reconnect attempts.

use std::time::Duration;

use crate::config::ReconnectConfig;

/// Delay before reconnect attempt number `attempt` (0-based).
///
/// `min(base * multiplier^min(attempt, cap_index), max)`
pub fn reconnect_delay(attempt: u32, policy: &ReconnectConfig) -> Duration {
    let exponent = attempt.min(policy.cap_index);
    let exponent = i32::try_from(exponent).unwrap_or(i32::MAX);

    let delay_ms = policy.base_delay_ms as f64 * policy.multiplier.powi(exponent);
    let capped_ms = delay_ms.min(policy.max_delay_ms as f64).max(0.0);

    Duration::from_micros((capped_ms * 1000.0).round() as u64)
}
