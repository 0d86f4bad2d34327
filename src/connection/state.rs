//! Connection state machine.
//!
//! # States
//! - Disconnected: no trusted endpoint
//! - Probing: a discovery sweep is running
//! - Connected: requests go to the active endpoint
//! - Degraded: the active endpoint just failed; reconnect pending
//!
//! # State Transitions
//! ```text
//! Disconnected --ProbeRequested--> Probing
//! Degraded     --ProbeRequested--> Probing (remembers the endpoint)
//! Probing      --ProbeSucceeded--> Connected
//! Connected    --ProbeSucceeded--> Connected (re-validated, possibly new endpoint)
//! Probing      --ProbeFailed-----> Degraded      (came from Degraded, attempts remain)
//!                              \-> Disconnected  (otherwise)
//! Connected    --RequestSucceeded--> Connected
//! Connected    --ConnectivityLost--> Degraded
//! any but Probing --WentOffline--> Disconnected
//! ```
//!
//! Events that do not apply to the current state leave it unchanged.

use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::endpoints::EndpointCandidate;
use crate::observability::metrics;

/// Observable connectivity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Probing,
    Connected,
    Degraded,
}

impl ConnectionState {
    fn metric_code(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Probing => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Degraded => 3,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Probing => "probing",
            ConnectionState::Connected => "connected",
            ConnectionState::Degraded => "degraded",
        };
        f.write_str(name)
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    ProbeRequested,
    ProbeSucceeded(EndpointCandidate),
    ProbeFailed,
    RequestSucceeded,
    ConnectivityLost,
    WentOffline,
}

/// State plus the data each state carries.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Disconnected,
    Probing {
        resume: Option<EndpointCandidate>,
        failed_reconnects: u32,
    },
    Connected {
        active: EndpointCandidate,
    },
    Degraded {
        active: EndpointCandidate,
        failed_reconnects: u32,
    },
}

impl Phase {
    pub fn state(&self) -> ConnectionState {
        match self {
            Phase::Disconnected => ConnectionState::Disconnected,
            Phase::Probing { .. } => ConnectionState::Probing,
            Phase::Connected { .. } => ConnectionState::Connected,
            Phase::Degraded { .. } => ConnectionState::Degraded,
        }
    }

    /// Only Connected and Degraded carry an active endpoint.
    pub fn active(&self) -> Option<&EndpointCandidate> {
        match self {
            Phase::Connected { active } | Phase::Degraded { active, .. } => Some(active),
            Phase::Disconnected | Phase::Probing { .. } => None,
        }
    }

    /// Pure transition function. `degraded_attempts` bounds how many failed
    /// reconnect probes keep the old endpoint around in Degraded.
    pub fn next(&self, event: &ConnectionEvent, degraded_attempts: u32) -> Phase {
        use ConnectionEvent as E;

        match (self, event) {
            (Phase::Disconnected, E::ProbeRequested) => Phase::Probing {
                resume: None,
                failed_reconnects: 0,
            },
            (
                Phase::Degraded {
                    active,
                    failed_reconnects,
                },
                E::ProbeRequested,
            ) => Phase::Probing {
                resume: Some(active.clone()),
                failed_reconnects: *failed_reconnects,
            },
            (Phase::Probing { .. } | Phase::Connected { .. }, E::ProbeSucceeded(winner)) => {
                Phase::Connected {
                    active: winner.clone(),
                }
            }
            (
                Phase::Probing {
                    resume: Some(active),
                    failed_reconnects,
                },
                E::ProbeFailed,
            ) if failed_reconnects + 1 < degraded_attempts => Phase::Degraded {
                active: active.clone(),
                failed_reconnects: failed_reconnects + 1,
            },
            (Phase::Probing { .. }, E::ProbeFailed) => Phase::Disconnected,
            (Phase::Connected { active }, E::ConnectivityLost) => Phase::Degraded {
                active: active.clone(),
                failed_reconnects: 0,
            },
            (Phase::Probing { .. }, E::WentOffline) => self.clone(),
            (_, E::WentOffline) => Phase::Disconnected,
            _ => self.clone(),
        }
    }
}

/// Thread-safe holder of the current phase.
#[derive(Debug)]
pub struct ConnectionStateMachine {
    phase: Mutex<Phase>,
    degraded_attempts: u32,
}

impl ConnectionStateMachine {
    pub fn new(degraded_attempts: u32) -> Self {
        metrics::record_connection_state(ConnectionState::Disconnected.metric_code());
        Self {
            phase: Mutex::new(Phase::Disconnected),
            degraded_attempts,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase.lock().expect("connection state mutex poisoned").clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.phase.lock().expect("connection state mutex poisoned").state()
    }

    pub fn active(&self) -> Option<EndpointCandidate> {
        self.phase
            .lock()
            .expect("connection state mutex poisoned")
            .active()
            .cloned()
    }

    /// Active endpoint only if Connected.
    pub fn connected(&self) -> Option<EndpointCandidate> {
        match &*self.phase.lock().expect("connection state mutex poisoned") {
            Phase::Connected { active } => Some(active.clone()),
            _ => None,
        }
    }

    /// Apply an event; returns `(before, after)`.
    pub fn apply(&self, event: ConnectionEvent) -> (ConnectionState, ConnectionState) {
        let mut phase = self.phase.lock().expect("connection state mutex poisoned");
        self.transition(&mut phase, event)
    }

    /// Demote to Degraded if `endpoint` is still the connected one.
    pub fn connectivity_lost(&self, endpoint: &EndpointCandidate) -> bool {
        let mut phase = self.phase.lock().expect("connection state mutex poisoned");
        match &*phase {
            Phase::Connected { active } if active == endpoint => {
                self.transition(&mut phase, ConnectionEvent::ConnectivityLost);
                true
            }
            _ => false,
        }
    }

    /// Enter Probing, returning the endpoint to re-validate first.
    ///
    /// From Connected the active endpoint is returned without a transition.
    pub fn begin_probe(&self) -> Option<EndpointCandidate> {
        let mut phase = self.phase.lock().expect("connection state mutex poisoned");
        let resume = match &*phase {
            Phase::Connected { active } => return Some(active.clone()),
            Phase::Probing { resume, .. } => return resume.clone(),
            Phase::Degraded { active, .. } => Some(active.clone()),
            Phase::Disconnected => None,
        };
        self.transition(&mut phase, ConnectionEvent::ProbeRequested);
        resume
    }

    fn transition(
        &self,
        phase: &mut Phase,
        event: ConnectionEvent,
    ) -> (ConnectionState, ConnectionState) {
        let before = phase.state();
        let next = phase.next(&event, self.degraded_attempts);
        let after = next.state();

        if next != *phase {
            tracing::info!(
                from = %before,
                to = %after,
                event = ?event,
                active = ?next.active().map(|c| c.url.as_str()),
                "Connection state transition"
            );
            metrics::record_connection_state(after.metric_code());
        }
        *phase = next;
        (before, after)
    }
}
