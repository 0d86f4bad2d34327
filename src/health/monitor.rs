//! Periodic background health checking.
//!
//! # Responsibilities
//! - Call `ApiClient::check_health` on a fixed interval
//! - Skip a tick when a check already ran within the minimum gap
//! - Follow reloaded settings: a new interval rebuilds the ticker, and
//!   `enabled = false` pauses checks until re-enabled

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::client::ApiClient;
use crate::config::HealthCheckConfig;

pub struct HealthMonitor {
    client: ApiClient,
}

impl HealthMonitor {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Run until shutdown. Returns at once if checks are disabled at startup.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut config = self.client.health_check_config();
        if !config.enabled {
            tracing::info!("Background health checks disabled");
            return;
        }

        tracing::info!(
            interval_secs = config.interval_secs,
            min_gap_secs = config.min_gap_secs,
            "Health monitor starting"
        );

        let mut ticker = new_ticker(Instant::now(), Duration::from_secs(config.interval_secs));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if config.enabled {
                        self.tick().await;
                    } else {
                        tracing::debug!("Background health checks paused");
                    }
                }
                _ = self.client.health_check_updated() => {
                    let updated = self.client.health_check_config();
                    if updated.interval_secs != config.interval_secs && updated.interval_secs > 0 {
                        let period = Duration::from_secs(updated.interval_secs);
                        ticker = new_ticker(Instant::now() + period, period);
                    }
                    log_update(&config, &updated);
                    config = updated;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn tick(&self) {
        let min_gap = Duration::from_secs(self.client.health_check_config().min_gap_secs);
        if let Some(since) = self.client.since_last_health_check() {
            if since < min_gap {
                tracing::debug!(
                    since_ms = since.as_millis() as u64,
                    "Health checked recently, skipping"
                );
                return;
            }
        }

        let outcome = self.client.check_health().await;
        match outcome.error() {
            None => tracing::debug!(state = %self.client.state(), "Background health check passed"),
            Some(e) => tracing::warn!(error = %e, "Background health check failed"),
        }
    }
}

fn new_ticker(start: Instant, period: Duration) -> Interval {
    let mut ticker = time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

fn log_update(old: &HealthCheckConfig, new: &HealthCheckConfig) {
    if old.enabled != new.enabled {
        tracing::info!(enabled = new.enabled, "Background health checks toggled");
    }
    if old.interval_secs != new.interval_secs {
        tracing::info!(
            from_secs = old.interval_secs,
            to_secs = new.interval_secs,
            "Health check interval changed"
        );
    }
}
