//! The connectivity-aware API client.
//!
//! # Responsibilities
//! - Resolve the endpoint for each request, discovering one when none is trusted
//! - Serialize discovery: concurrent callers share one in-flight sweep
//! - Demote on connectivity failures and arm the reconnect scheduler
//! - React to host online/offline signals
//!
//! # Design Decisions
//! - One explicitly constructed client owns all connectivity state; clones
//!   share it
//! - Background timers hold a weak reference, so dropping the last client
//!   handle stops them

use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

use crate::client::executor::RequestExecutor;
use crate::client::operation::Operation;
use crate::client::outcome::RequestOutcome;
use crate::client::types::{
    HealthReport, MutationTestResult, TestCustomRequest, TestGithubRequest,
};
use crate::config::{ClientConfig, EndpointsConfig, HealthCheckConfig, ProbeConfig, TimeoutConfig};
use crate::connection::{ConnectionEvent, ConnectionState, ConnectionStateMachine, ReconnectScheduler};
use crate::endpoints::{EndpointCandidate, EndpointRegistry, ExecutionContext};
use crate::health::{AttemptBook, AttemptRecord, HealthProber, ProbeError, ProbeSuccess};
use crate::lifecycle::{EnvironmentObserver, EnvironmentSignal, ScheduledTask};
use crate::observability::metrics;
use crate::observability::telemetry::{error_chain, TelemetrySink, TelemetrySnapshot};

type DiscoverySweep = Shared<BoxFuture<'static, Result<ProbeSuccess, ProbeError>>>;

/// Why a discovery sweep was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Caller,
    Reconnect,
    /// The active endpoint just failed its own check; don't re-validate it first.
    ActiveCheckFailed,
}

/// Client construction failures.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no endpoint candidates supplied")]
    NoCandidates,
}

/// Serializable view of the client's connectivity.
#[derive(Debug, Clone, Serialize)]
pub struct ClientStatus {
    pub state: ConnectionState,
    pub active_endpoint: Option<String>,
    pub candidates: Vec<EndpointCandidate>,
    pub reconnect_attempt: u32,
    pub reconnect_pending: bool,
    pub telemetry: TelemetrySnapshot,
}

/// Handle to the shared client. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    candidates: Vec<EndpointCandidate>,
    attempts: AttemptBook,
    state: ConnectionStateMachine,
    telemetry: TelemetrySink,
    prober: HealthProber,
    executor: RequestExecutor,
    scheduler: ReconnectScheduler,
    timeouts: ArcSwap<TimeoutConfig>,
    health_check: ArcSwap<HealthCheckConfig>,
    health_check_changed: Notify,
    endpoints: EndpointsConfig,
    probe: ProbeConfig,
    discovery: Mutex<Option<DiscoverySweep>>,
    last_health_check: Mutex<Option<Instant>>,
}

impl ApiClient {
    /// Build a client whose candidates come from the registry for `context`.
    pub fn new(config: &ClientConfig, context: &ExecutionContext) -> Result<Self, ClientError> {
        let candidates = EndpointRegistry::new(config.endpoints.clone()).candidates(context);
        Self::with_candidates(config, candidates)
    }

    /// Build a client for the execution context described by the config.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::new(config, &ExecutionContext::from_config(&config.endpoints))
    }

    /// Build a client with an explicit, already ordered candidate list.
    pub fn with_candidates(
        config: &ClientConfig,
        candidates: Vec<EndpointCandidate>,
    ) -> Result<Self, ClientError> {
        if candidates.is_empty() {
            return Err(ClientError::NoCandidates);
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("testforge-connect/", env!("CARGO_PKG_VERSION")));
        if !config.endpoints.use_system_proxy {
            builder = builder.no_proxy();
        }
        let http = builder.build()?;

        tracing::info!(
            candidates = ?candidates.iter().map(|c| c.url.as_str()).collect::<Vec<_>>(),
            "API client initialized"
        );

        let inner = ClientInner {
            attempts: AttemptBook::new(config.probe.failure_threshold),
            state: ConnectionStateMachine::new(config.reconnect.degraded_attempts),
            telemetry: TelemetrySink::new(true),
            prober: HealthProber::new(http.clone(), config.probe.health_path.clone()),
            executor: RequestExecutor::new(http),
            scheduler: ReconnectScheduler::new(config.reconnect.clone(), true),
            timeouts: ArcSwap::from_pointee(config.timeouts.clone()),
            health_check: ArcSwap::from_pointee(config.health_check.clone()),
            health_check_changed: Notify::new(),
            endpoints: config.endpoints.clone(),
            probe: config.probe.clone(),
            discovery: Mutex::new(None),
            last_health_check: Mutex::new(None),
            candidates,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Perform one logical request, discovering an endpoint first if needed.
    pub async fn execute<T>(&self, operation: Operation) -> RequestOutcome<T>
    where
        T: DeserializeOwned,
    {
        self.inner.execute(operation).await
    }

    pub async fn test_custom_code(&self, request: TestCustomRequest) -> RequestOutcome<MutationTestResult> {
        self.execute(Operation::TestCustomCode(request)).await
    }

    pub async fn test_github_repo(&self, request: TestGithubRequest) -> RequestOutcome<MutationTestResult> {
        self.execute(Operation::TestGithubRepo(request)).await
    }

    pub async fn run_demo_test(&self) -> RequestOutcome<MutationTestResult> {
        self.execute(Operation::RunDemo).await
    }

    pub async fn get_results(&self, session_id: &str) -> RequestOutcome<MutationTestResult> {
        self.execute(Operation::GetResults(session_id.to_string())).await
    }

    /// Confirm the backend is reachable.
    ///
    /// Re-checks the connected endpoint only; falls back to a discovery sweep
    /// when there is none or it no longer answers.
    pub async fn check_health(&self) -> RequestOutcome<HealthReport> {
        self.inner.check_health().await
    }

    /// Run discovery now, joining any sweep already in flight.
    pub async fn discover(&self) -> Result<EndpointCandidate, ProbeError> {
        self.inner.discover(Trigger::Caller).await.map(|success| success.candidate)
    }

    /// Follow the host's connectivity signals until the returned task is dropped.
    pub fn attach_environment(&self, observer: &dyn EnvironmentObserver) -> ScheduledTask {
        let mut signals = observer.subscribe();
        if !observer.is_online() {
            self.inner.on_environment_signal(EnvironmentSignal::Offline);
        }

        let weak: Weak<ClientInner> = Arc::downgrade(&self.inner);
        ScheduledTask::spawn(async move {
            loop {
                match signals.recv().await {
                    Ok(signal) => match weak.upgrade() {
                        Some(inner) => inner.on_environment_signal(signal),
                        None => break,
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Environment signals dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            tracing::debug!("Environment subscription ended");
        })
    }

    pub fn on_environment_signal(&self, signal: EnvironmentSignal) {
        self.inner.on_environment_signal(signal);
    }

    /// Swap in reloadable settings. Endpoint and probe settings need a new client.
    pub fn apply_config(&self, config: &ClientConfig) {
        let inner = &self.inner;
        inner.timeouts.store(Arc::new(config.timeouts.clone()));
        inner.health_check.store(Arc::new(config.health_check.clone()));
        inner.health_check_changed.notify_one();
        inner.scheduler.update_policy(config.reconnect.clone());

        if config.endpoints != inner.endpoints || config.probe != inner.probe {
            tracing::warn!("Endpoint or probe settings changed; restart to apply them");
        }
        tracing::info!(
            request_ms = config.timeouts.request_ms,
            probe_ms = config.timeouts.probe_ms,
            base_delay_ms = config.reconnect.base_delay_ms,
            "Configuration applied"
        );
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.state()
    }

    pub fn active_endpoint(&self) -> Option<EndpointCandidate> {
        self.inner.state.active()
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.inner.telemetry.snapshot()
    }

    pub fn candidates(&self) -> &[EndpointCandidate] {
        &self.inner.candidates
    }

    pub fn attempt_record(&self, url: &str) -> AttemptRecord {
        self.inner.attempts.get(url)
    }

    pub fn reconnect_attempt(&self) -> u32 {
        self.inner.scheduler.attempt()
    }

    pub fn reconnect_pending(&self) -> bool {
        self.inner.scheduler.has_pending()
    }

    pub fn health_check_config(&self) -> Arc<HealthCheckConfig> {
        self.inner.health_check.load_full()
    }

    /// Resolves after `apply_config` swaps in new health-check settings.
    pub fn health_check_updated(&self) -> Notified<'_> {
        self.inner.health_check_changed.notified()
    }

    /// Time since the last health check, if one has run.
    pub fn since_last_health_check(&self) -> Option<Duration> {
        self.inner
            .last_health_check
            .lock()
            .expect("health check mutex poisoned")
            .map(|at| at.elapsed())
    }

    pub fn status(&self) -> ClientStatus {
        ClientStatus {
            state: self.state(),
            active_endpoint: self.active_endpoint().map(|c| c.url),
            candidates: self.inner.candidates.clone(),
            reconnect_attempt: self.reconnect_attempt(),
            reconnect_pending: self.reconnect_pending(),
            telemetry: self.telemetry(),
        }
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("state", &self.inner.state.phase())
            .field("candidates", &self.inner.candidates)
            .finish_non_exhaustive()
    }
}

impl ClientInner {
    async fn execute<T>(self: &Arc<Self>, operation: Operation) -> RequestOutcome<T>
    where
        T: DeserializeOwned,
    {
        let endpoint = match self.state.connected() {
            Some(endpoint) => endpoint,
            None => match self.discover(Trigger::Caller).await {
                Ok(success) => success.candidate,
                Err(e) => {
                    tracing::warn!(operation = operation.name(), error = %e, "No endpoint available for request");
                    metrics::record_request(operation.name(), "endpoints_exhausted", Duration::ZERO);
                    return RequestOutcome::AllEndpointsExhausted;
                }
            },
        };

        let timeout = self.timeouts.load().request();
        let exchange = self.executor.send::<T>(&endpoint, &operation, timeout).await;
        let outcome = exchange.outcome;
        metrics::record_request(operation.name(), outcome.kind(), exchange.elapsed);

        match outcome.error() {
            None => {
                self.attempts.reset(&endpoint.url);
                self.state.apply(ConnectionEvent::RequestSucceeded);
                self.telemetry.record_success(&endpoint.url, exchange.elapsed);
                tracing::info!(
                    request_id = %exchange.request_id,
                    operation = operation.name(),
                    endpoint = %endpoint,
                    elapsed_ms = exchange.elapsed.as_millis() as u64,
                    "Request succeeded"
                );
            }
            Some(error) => {
                self.telemetry.record_failure(
                    &error.to_string(),
                    error.detail().map(str::to_string),
                    Some(exchange.elapsed),
                );

                if outcome.is_connectivity_failure() {
                    tracing::warn!(
                        request_id = %exchange.request_id,
                        operation = operation.name(),
                        endpoint = %endpoint,
                        outcome = outcome.kind(),
                        detail = error.detail().unwrap_or_default(),
                        "Request lost connectivity"
                    );
                    if self.state.connectivity_lost(&endpoint) {
                        self.telemetry.set_active_endpoint(Some(&endpoint.url));
                        self.arm_reconnect();
                    }
                } else {
                    tracing::info!(
                        request_id = %exchange.request_id,
                        operation = operation.name(),
                        endpoint = %endpoint,
                        outcome = outcome.kind(),
                        error = %error,
                        "Request failed, endpoint still reachable"
                    );
                }
            }
        }

        outcome
    }

    /// Start a discovery sweep or join the one in flight.
    async fn discover(self: &Arc<Self>, trigger: Trigger) -> Result<ProbeSuccess, ProbeError> {
        let sweep = {
            let mut slot = self.discovery.lock().expect("discovery mutex poisoned");
            match slot.as_ref() {
                Some(sweep) => {
                    tracing::debug!("Joining in-flight discovery");
                    sweep.clone()
                }
                None => {
                    let inner = Arc::clone(self);
                    let sweep = async move { inner.run_discovery(trigger).await }
                        .boxed()
                        .shared();
                    *slot = Some(sweep.clone());
                    sweep
                }
            }
        };
        sweep.await
    }

    async fn run_discovery(self: Arc<Self>, trigger: Trigger) -> Result<ProbeSuccess, ProbeError> {
        self.telemetry.record_attempt();
        let started = Instant::now();
        let previous = self.state.begin_probe();
        let timeout = self.timeouts.load().probe();
        let revalidate = match trigger {
            Trigger::ActiveCheckFailed => None,
            Trigger::Caller | Trigger::Reconnect => previous.as_ref(),
        };

        let result = self
            .prober
            .probe(&self.candidates, &self.attempts, revalidate, timeout)
            .await;

        match &result {
            Ok(success) => {
                self.state
                    .apply(ConnectionEvent::ProbeSucceeded(success.candidate.clone()));
                self.scheduler.record_success();
                self.telemetry
                    .record_success(&success.candidate.url, started.elapsed());
            }
            Err(e) => {
                self.state.apply(ConnectionEvent::ProbeFailed);
                if let Some(previous) = &previous {
                    self.state.connectivity_lost(previous);
                }
                self.telemetry
                    .record_failure(&e.to_string(), Some(error_chain(e)), Some(started.elapsed()));
                self.telemetry
                    .set_active_endpoint(self.state.active().as_ref().map(|c| c.url.as_str()));
                if trigger == Trigger::Reconnect {
                    self.scheduler.record_failure();
                }
                self.arm_reconnect();
            }
        }

        *self.discovery.lock().expect("discovery mutex poisoned") = None;
        result
    }

    fn arm_reconnect(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.scheduler.arm(async move {
            if let Some(inner) = weak.upgrade() {
                inner.reconnect().await;
            }
        });
    }

    async fn reconnect(self: &Arc<Self>) {
        if self.state.connected().is_some() {
            tracing::debug!("Already connected, reconnect skipped");
            return;
        }

        self.telemetry.record_restart();
        tracing::info!(attempt = self.scheduler.attempt() + 1, "Attempting reconnect");
        match self.discover(Trigger::Reconnect).await {
            Ok(success) => tracing::info!(endpoint = %success.candidate, "Reconnected"),
            Err(e) => tracing::warn!(error = %e, "Reconnect failed"),
        }
    }

    async fn check_health(self: &Arc<Self>) -> RequestOutcome<HealthReport> {
        *self
            .last_health_check
            .lock()
            .expect("health check mutex poisoned") = Some(Instant::now());

        let mut trigger = Trigger::Caller;
        if let Some(active) = self.state.connected() {
            self.telemetry.record_attempt();
            let started = Instant::now();
            let timeout = self.timeouts.load().probe();
            match self.prober.check(&active, timeout).await {
                Ok(health) => {
                    self.telemetry.record_success(&active.url, started.elapsed());
                    metrics::record_probe("ok");
                    return RequestOutcome::Success(HealthReport {
                        health,
                        endpoint: active.url,
                    });
                }
                Err(e) => {
                    metrics::record_probe("failed");
                    tracing::warn!(endpoint = %active, error = %e, "Health check failed");
                    self.telemetry.record_failure(
                        &format!("Health check failed for {active}"),
                        Some(error_chain(&e)),
                        Some(started.elapsed()),
                    );
                    self.state.connectivity_lost(&active);
                    trigger = Trigger::ActiveCheckFailed;
                }
            }
        }

        match self.discover(trigger).await {
            Ok(success) => RequestOutcome::Success(HealthReport {
                health: success.health,
                endpoint: success.candidate.url,
            }),
            Err(_) => RequestOutcome::AllEndpointsExhausted,
        }
    }

    fn on_environment_signal(self: &Arc<Self>, signal: EnvironmentSignal) {
        match signal {
            EnvironmentSignal::Offline => {
                tracing::warn!("Host went offline");
                self.scheduler.go_offline();
                self.state.apply(ConnectionEvent::WentOffline);
                self.telemetry.set_online(false);
                self.telemetry
                    .set_active_endpoint(self.state.active().as_ref().map(|c| c.url.as_str()));
            }
            EnvironmentSignal::Online => {
                tracing::info!("Host back online");
                self.telemetry.set_online(true);
                let weak = Arc::downgrade(self);
                self.scheduler.go_online(async move {
                    if let Some(inner) = weak.upgrade() {
                        let outcome = inner.check_health().await;
                        tracing::info!(outcome = outcome.kind(), "Recovery health check finished");
                    }
                });
            }
            EnvironmentSignal::FatalResourceLoad(message) => {
                tracing::error!(error = %message, "Host reported a fatal resource load failure");
                self.telemetry.record_error(&message);
            }
        }
    }
}
