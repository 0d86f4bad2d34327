//! Host environment signals.
//!
//! The host platform reports network availability and fatal resource-load
//! failures through an [`EnvironmentObserver`]. The client subscribes once
//! and reacts: offline pauses reconnection, online schedules a recovery probe.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

/// A signal emitted by the host environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentSignal {
    Online,
    Offline,
    /// A resource the host needed failed to load. Recorded, never acted on.
    FatalResourceLoad(String),
}

/// Capability supplied by the host: current availability plus a signal stream.
pub trait EnvironmentObserver: Send + Sync {
    fn is_online(&self) -> bool;
    fn subscribe(&self) -> broadcast::Receiver<EnvironmentSignal>;
}

/// Channel-backed environment the host drives explicitly.
#[derive(Debug, Clone)]
pub struct Environment {
    tx: broadcast::Sender<EnvironmentSignal>,
    online: Arc<AtomicBool>,
}

impl Environment {
    pub fn new(initially_online: bool) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            tx,
            online: Arc::new(AtomicBool::new(initially_online)),
        }
    }

    /// Mark the network available. Signals only on an offline to online change.
    pub fn set_online(&self) {
        if self.online.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("Host reports network available");
        let _ = self.tx.send(EnvironmentSignal::Online);
    }

    /// Mark the network unavailable. Signals only on an online to offline change.
    pub fn set_offline(&self) {
        if !self.online.swap(false, Ordering::SeqCst) {
            return;
        }
        tracing::info!("Host reports network unavailable");
        let _ = self.tx.send(EnvironmentSignal::Offline);
    }

    pub fn report_fatal_resource_load(&self, message: impl Into<String>) {
        let _ = self
            .tx
            .send(EnvironmentSignal::FatalResourceLoad(message.into()));
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(true)
    }
}

impl EnvironmentObserver for Environment {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> broadcast::Receiver<EnvironmentSignal> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signals_reach_subscribers() {
        let env = Environment::new(true);
        let mut rx = env.subscribe();

        env.set_offline();
        assert!(!env.is_online());
        env.report_fatal_resource_load("model.glb");
        env.set_online();

        assert_eq!(rx.recv().await.unwrap(), EnvironmentSignal::Offline);
        assert_eq!(
            rx.recv().await.unwrap(),
            EnvironmentSignal::FatalResourceLoad("model.glb".into())
        );
        assert_eq!(rx.recv().await.unwrap(), EnvironmentSignal::Online);
        assert!(env.is_online());
    }

    #[tokio::test]
    async fn test_repeated_reports_signal_once() {
        let env = Environment::new(true);
        let mut rx = env.subscribe();

        env.set_online();
        env.set_online();
        assert!(rx.try_recv().is_err());

        env.set_offline();
        env.set_offline();
        env.set_online();
        env.set_online();

        assert_eq!(rx.recv().await.unwrap(), EnvironmentSignal::Offline);
        assert_eq!(rx.recv().await.unwrap(), EnvironmentSignal::Online);
        assert!(rx.try_recv().is_err());
    }
}
