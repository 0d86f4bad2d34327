//! Request execution, demotion and recovery through the public client.

use std::time::{Duration, Instant};

use serde_json::Value;
use testforge_connect::client::{RequestOutcome, TestCustomRequest, TestGithubRequest};
use testforge_connect::lifecycle::Environment;
use testforge_connect::{ApiClient, ConnectionState};

mod common;
use common::{dead_candidate, test_config, wait_for, MockBackend, Reply};

const RESULT: &str = r#"{
    "total_mutations": 4,
    "tests_passed_original": 3,
    "tests_detected_mutations": 3,
    "mutation_detection_rate": 75.0,
    "mutation_results": [
        {"mutation_id": 1, "mutation_description": "+ to -", "original_code": "a + b", "mutated_code": "a - b", "was_detected": true, "detected_by_tests": ["test_add"]}
    ],
    "test_details": []
}"#;

#[tokio::test]
async fn test_first_request_discovers_then_posts() {
    let x = dead_candidate().await;
    let y = MockBackend::start().await;
    y.route("/api/test-custom", Reply::json(200, RESULT));

    let client = ApiClient::with_candidates(&test_config(), vec![x.clone(), y.candidate()]).unwrap();
    assert_eq!(client.state(), ConnectionState::Disconnected);

    let outcome = client
        .test_custom_code(TestCustomRequest {
            code: "def add(a, b):\n    return a + b".into(),
            ..TestCustomRequest::default()
        })
        .await;

    match outcome {
        RequestOutcome::Success(result) => {
            assert_eq!(result.total_mutations, 4);
            assert_eq!(result.mutation_results.len(), 1);
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    assert_eq!(client.attempt_record(&x.url).consecutive_failures, 1);
    let requests = y.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!((requests[0].method.as_str(), requests[0].path.as_str()), ("GET", "/api/health"));
    assert_eq!((requests[1].method.as_str(), requests[1].path.as_str()), ("POST", "/api/test-custom"));

    let post = &requests[1];
    assert_eq!(post.headers.get("content-type").map(String::as_str), Some("application/json"));
    assert_eq!(post.headers.get("accept").map(String::as_str), Some("application/json"));
    assert!(post.headers.contains_key("x-request-id"));
    let body: Value = serde_json::from_str(&post.body).unwrap();
    assert_eq!(body, serde_json::json!({ "code": "def add(a, b):\n    return a + b" }));

    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(client.active_endpoint(), Some(y.candidate()));

    let telemetry = client.telemetry();
    assert_eq!(telemetry.active_endpoint.as_deref(), Some(y.url().as_str()));
    assert!(telemetry.last_response_time_ms.is_some());
    assert_eq!(telemetry.failed_attempts, 0);
}

#[tokio::test]
async fn test_connected_client_skips_discovery() {
    let y = MockBackend::start().await;
    y.route("/api/results/session-1", Reply::json(200, RESULT));
    let client = ApiClient::with_candidates(&test_config(), vec![y.candidate()]).unwrap();

    for _ in 0..3 {
        assert!(client.get_results("session-1").await.is_success());
    }

    assert_eq!(y.hits("/api/health"), 1);
    assert_eq!(y.hits("/api/results/session-1"), 3);
}

#[tokio::test]
async fn test_timeout_is_bounded_and_demotes() {
    let y = MockBackend::start().await;
    y.route("/api/run-tests", Reply::Hang);
    let z = MockBackend::start().await;

    let mut config = test_config();
    config.timeouts.request_ms = 300;
    config.timeouts.probe_ms = 200;
    let client = ApiClient::with_candidates(&config, vec![y.candidate(), z.candidate()]).unwrap();
    client.discover().await.unwrap();

    let started = Instant::now();
    let outcome = client.run_demo_test().await;
    let elapsed = started.elapsed();

    assert_eq!(outcome, RequestOutcome::Timeout);
    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed < Duration::from_millis(1300), "took {elapsed:?}");
    assert!(outcome
        .user_message()
        .unwrap()
        .starts_with("Request timeout"));

    assert_eq!(client.state(), ConnectionState::Degraded);
    assert_eq!(client.active_endpoint(), Some(y.candidate()));
    assert!(client.reconnect_pending());

    // The abandoned exchange must not report anything later
    let failed = client.telemetry().failed_attempts;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(client.telemetry().failed_attempts, failed);

    // Recovery re-validates the degraded endpoint before anything else
    assert_eq!(client.discover().await.unwrap(), y.candidate());
    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(z.total_hits(), 0);
    assert!(!client.reconnect_pending());
}

#[tokio::test]
async fn test_parse_failure_keeps_connection() {
    let y = MockBackend::start().await;
    y.route("/api/run-tests", Reply::text(200, "<html>Gateway</html>"));
    let client = ApiClient::with_candidates(&test_config(), vec![y.candidate()]).unwrap();

    let outcome = client.run_demo_test().await;

    assert!(matches!(outcome, RequestOutcome::ParseFailure(_)), "{outcome:?}");
    assert_eq!(client.state(), ConnectionState::Connected);
    assert!(!client.reconnect_pending());
    assert_eq!(
        client.telemetry().last_error_message.as_deref(),
        Some("The server returned malformed data.")
    );
}

#[tokio::test]
async fn test_application_error_prefers_backend_message() {
    let y = MockBackend::start().await;
    y.route(
        "/api/test-github",
        Reply::json(400, r#"{"error":"Repository URL is required"}"#),
    );
    let client = ApiClient::with_candidates(&test_config(), vec![y.candidate()]).unwrap();

    let outcome = client.test_github_repo(TestGithubRequest::default()).await;

    assert_eq!(
        outcome,
        RequestOutcome::ApplicationError("Repository URL is required".into())
    );
    assert_eq!(client.state(), ConnectionState::Connected);
    let telemetry = client.telemetry();
    assert_eq!(telemetry.failed_attempts, 1);
    assert_eq!(
        telemetry.last_error_message.as_deref(),
        Some("Repository URL is required")
    );
}

#[tokio::test]
async fn test_no_reachable_endpoint() {
    let client = ApiClient::with_candidates(&test_config(), vec![dead_candidate().await]).unwrap();

    let outcome = client.run_demo_test().await;

    assert_eq!(outcome, RequestOutcome::AllEndpointsExhausted);
    assert!(outcome
        .user_message()
        .unwrap()
        .starts_with("Unable to connect to any API endpoint"));
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(client.reconnect_pending());
}

#[tokio::test]
async fn test_dropped_connection_reconnects_automatically() {
    let y = MockBackend::start().await;
    y.route("/api/run-tests", Reply::Close);

    let mut config = test_config();
    config.reconnect.base_delay_ms = 100;
    let client = ApiClient::with_candidates(&config, vec![y.candidate()]).unwrap();

    let outcome = client.run_demo_test().await;
    assert!(matches!(outcome, RequestOutcome::NetworkFailure(_)), "{outcome:?}");
    assert_eq!(client.state(), ConnectionState::Degraded);

    assert!(wait_for(Duration::from_secs(3), || client.state() == ConnectionState::Connected).await);
    assert_eq!(client.telemetry().restart_attempts, 1);
    assert_eq!(client.reconnect_attempt(), 0);
    assert_eq!(y.hits("/api/health"), 2);
}

#[tokio::test]
async fn test_reconnect_recovers_once_backend_returns() {
    let y = MockBackend::unhealthy(503).await;

    let mut config = test_config();
    config.reconnect.base_delay_ms = 100;
    config.reconnect.max_delay_ms = 200;
    let client = ApiClient::with_candidates(&config, vec![y.candidate()]).unwrap();

    assert!(client.discover().await.is_err());
    assert_eq!(client.state(), ConnectionState::Disconnected);

    assert!(wait_for(Duration::from_secs(2), || client.reconnect_attempt() >= 1).await);
    y.route("/api/health", Reply::healthy());

    assert!(wait_for(Duration::from_secs(3), || client.state() == ConnectionState::Connected).await);
    assert_eq!(client.reconnect_attempt(), 0);
    assert!(client.telemetry().restart_attempts >= 2);
    assert!(!client.reconnect_pending());
}

#[tokio::test]
async fn test_offline_then_online_recovers() {
    let y = MockBackend::start().await;

    let mut config = test_config();
    config.reconnect.online_settle_ms = 100;
    let client = ApiClient::with_candidates(&config, vec![y.candidate()]).unwrap();
    let environment = Environment::new(true);
    let _subscription = client.attach_environment(&environment);

    client.discover().await.unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);

    environment.set_offline();
    assert!(wait_for(Duration::from_secs(1), || client.state() == ConnectionState::Disconnected).await);
    assert!(!client.telemetry().online);
    assert!(!client.reconnect_pending());
    assert_eq!(client.active_endpoint(), None);

    environment.set_online();
    assert!(wait_for(Duration::from_secs(2), || client.state() == ConnectionState::Connected).await);
    assert!(client.telemetry().online);
    assert_eq!(y.hits("/api/health"), 2);
}

#[tokio::test]
async fn test_fatal_resource_load_is_recorded() {
    let y = MockBackend::start().await;
    let client = ApiClient::with_candidates(&test_config(), vec![y.candidate()]).unwrap();
    let environment = Environment::new(true);
    let _subscription = client.attach_environment(&environment);

    environment.report_fatal_resource_load("model.glb failed to load");

    assert!(
        wait_for(Duration::from_secs(1), || {
            client.telemetry().last_error_message.as_deref() == Some("model.glb failed to load")
        })
        .await
    );
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_health_check_rechecks_active_only() {
    let a = MockBackend::start().await;
    let b = MockBackend::start().await;
    let client = ApiClient::with_candidates(&test_config(), vec![a.candidate(), b.candidate()]).unwrap();

    let first = client.check_health().await.into_result().unwrap();
    assert_eq!(first.endpoint, a.url());
    assert_eq!(first.health.status, "ok");

    let second = client.check_health().await.into_result().unwrap();
    assert_eq!(second.endpoint, a.url());
    assert_eq!(a.hits("/api/health"), 2);
    assert_eq!(b.total_hits(), 0);
    assert!(client.since_last_health_check().is_some());

    a.route("/api/health", Reply::json(503, r#"{"status":"down"}"#));
    let third = client.check_health().await.into_result().unwrap();
    assert_eq!(third.endpoint, b.url());
    assert_eq!(client.active_endpoint(), Some(b.candidate()));
}

#[tokio::test]
async fn test_failed_health_check_goes_straight_to_scan() {
    let a = MockBackend::start().await;
    let b = MockBackend::start().await;
    let mut config = test_config();
    config.timeouts.probe_ms = 300;
    let client = ApiClient::with_candidates(&config, vec![a.candidate(), b.candidate()]).unwrap();
    assert_eq!(client.discover().await.unwrap(), a.candidate());
    assert_eq!(a.hits("/api/health"), 1);

    a.route("/api/health", Reply::Hang);
    let started = Instant::now();
    let report = client.check_health().await.into_result().unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.endpoint, b.url());
    // One failed check plus one scan probe, no second look at the dead endpoint first
    assert_eq!(a.hits("/api/health"), 3);
    assert!(elapsed < Duration::from_millis(900), "took {elapsed:?}");
    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(client.attempt_record(&a.url()).consecutive_failures, 1);
}

#[tokio::test]
async fn test_apply_config_takes_effect_without_restart() {
    let y = MockBackend::start().await;
    y.route("/api/run-tests", Reply::Hang);
    let client = ApiClient::with_candidates(&test_config(), vec![y.candidate()]).unwrap();
    client.discover().await.unwrap();

    let mut updated = test_config();
    updated.timeouts.request_ms = 300;
    updated.timeouts.probe_ms = 200;
    updated.reconnect.base_delay_ms = 100;
    updated.health_check.enabled = true;
    updated.health_check.interval_secs = 5;
    client.apply_config(&updated);

    let health = client.health_check_config();
    assert!(health.enabled);
    assert_eq!(health.interval_secs, 5);

    let started = Instant::now();
    assert_eq!(client.run_demo_test().await, RequestOutcome::Timeout);
    assert!(started.elapsed() < Duration::from_millis(1500), "took {:?}", started.elapsed());
    assert_eq!(client.state(), ConnectionState::Degraded);

    // Default base delay is seconds; the reloaded one reconnects almost at once
    assert!(wait_for(Duration::from_secs(1), || client.state() == ConnectionState::Connected).await);
    assert_eq!(client.telemetry().restart_attempts, 1);
}
