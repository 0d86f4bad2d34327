//! Reconnect timing.
//!
//! # Responsibilities
//! - Hold at most one pending reconnect probe
//! - Delay it by bounded exponential backoff on the failed-attempt count
//! - Pause while the host is offline; probe shortly after it returns
//!
//! # Design Decisions
//! - Re-arming replaces the pending timer (idempotent, never a queue)
//! - The probe itself is supplied by the caller; the scheduler only times it

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;

use crate::config::ReconnectConfig;
use crate::lifecycle::ScheduledTask;
use crate::resilience::reconnect_delay;

#[derive(Debug)]
struct SchedulerState {
    attempt: u32,
    online: bool,
    pending: Option<ScheduledTask>,
}

/// Times automatic recovery probes.
#[derive(Debug)]
pub struct ReconnectScheduler {
    policy: ArcSwap<ReconnectConfig>,
    state: Mutex<SchedulerState>,
}

impl ReconnectScheduler {
    pub fn new(policy: ReconnectConfig, online: bool) -> Self {
        Self {
            policy: ArcSwap::from_pointee(policy),
            state: Mutex::new(SchedulerState {
                attempt: 0,
                online,
                pending: None,
            }),
        }
    }

    pub fn policy(&self) -> Arc<ReconnectConfig> {
        self.policy.load_full()
    }

    pub fn update_policy(&self, policy: ReconnectConfig) {
        self.policy.store(Arc::new(policy));
    }

    /// Schedule `probe` after the backoff delay for the current attempt count.
    ///
    /// Replaces any pending probe. Returns `None` without scheduling while offline.
    pub fn arm<F>(&self, probe: F) -> Option<Duration>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut state = self.state.lock().expect("scheduler mutex poisoned");
        if !state.online {
            tracing::debug!("Host offline, not arming reconnect");
            return None;
        }

        let delay = reconnect_delay(state.attempt, &self.policy.load());
        tracing::info!(
            delay_ms = delay.as_millis() as u64,
            attempt = state.attempt + 1,
            "Reconnect scheduled"
        );
        state.pending = Some(ScheduledTask::after(delay, probe));
        Some(delay)
    }

    /// A reconnect probe failed; returns the new attempt count.
    pub fn record_failure(&self) -> u32 {
        let mut state = self.state.lock().expect("scheduler mutex poisoned");
        state.attempt = state.attempt.saturating_add(1);
        state.attempt
    }

    /// Connectivity restored: reset backoff and drop any pending probe.
    pub fn record_success(&self) {
        let mut state = self.state.lock().expect("scheduler mutex poisoned");
        state.attempt = 0;
        if state.pending.take().is_some() {
            tracing::debug!("Reconnect no longer needed, pending probe cancelled");
        }
    }

    /// Drop the pending probe, if any.
    pub fn cancel(&self) {
        let mut state = self.state.lock().expect("scheduler mutex poisoned");
        state.pending = None;
    }

    /// Host lost the network: cancel outright and refuse to arm.
    pub fn go_offline(&self) {
        let mut state = self.state.lock().expect("scheduler mutex poisoned");
        state.online = false;
        if state.pending.take().is_some() {
            tracing::info!("Host offline, pending reconnect cancelled");
        }
    }

    /// Host regained the network: schedule `probe` after the settle delay,
    /// replacing whatever was pending.
    pub fn go_online<F>(&self, probe: F) -> Duration
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let settle = self.policy.load().online_settle();
        let mut state = self.state.lock().expect("scheduler mutex poisoned");
        state.online = true;
        state.pending = Some(ScheduledTask::after(settle, probe));
        tracing::info!(settle_ms = settle.as_millis() as u64, "Host online, recovery probe scheduled");
        settle
    }

    pub fn attempt(&self) -> u32 {
        self.state.lock().expect("scheduler mutex poisoned").attempt
    }

    pub fn is_online(&self) -> bool {
        self.state.lock().expect("scheduler mutex poisoned").online
    }

    pub fn has_pending(&self) -> bool {
        self.state
            .lock()
            .expect("scheduler mutex poisoned")
            .pending
            .as_ref()
            .is_some_and(ScheduledTask::is_pending)
    }
}
