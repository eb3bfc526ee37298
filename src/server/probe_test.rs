//! Tests for probe server start/stop lifecycle

use super::*;
use async_trait::async_trait;
use axum::response::{IntoResponse, Response};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

fn loopback_config() -> ProbeConfig {
    ProbeConfig::default()
        .with_bind_address(IpAddr::V4(Ipv4Addr::LOCALHOST))
        .with_port(0)
}

/// Readiness check that announces it has started, then takes `delay`
struct SlowCheck {
    delay: Duration,
    entered: Arc<Notify>,
}

#[async_trait]
impl ReadinessCheck for SlowCheck {
    async fn check(&self) -> Response {
        self.entered.notify_one();
        tokio::time::sleep(self.delay).await;
        (axum::http::StatusCode::OK, SUCCESS_BODY).into_response()
    }
}

/// Start a ready server whose readiness check takes `delay`, and issue one
/// `/readiness` request that is inside the check when this returns
async fn start_with_request_in_flight(
    delay: Duration,
) -> (ProbeServer, tokio::task::JoinHandle<reqwest::Result<u16>>) {
    let entered = Arc::new(Notify::new());
    let mut server = ProbeServer::new(loopback_config().with_readiness_check(SlowCheck {
        delay,
        entered: entered.clone(),
    }));
    let addr = server.start().await.expect("start should succeed");
    server.set_ready();

    let request = tokio::spawn(async move {
        let response = reqwest::Client::new()
            .get(format!("http://{}/readiness", addr))
            .timeout(Duration::from_secs(10))
            .send()
            .await?;
        Ok::<u16, reqwest::Error>(response.status().as_u16())
    });

    tokio::time::timeout(Duration::from_secs(5), entered.notified())
        .await
        .expect("request should reach the readiness check");

    (server, request)
}

#[tokio::test]
async fn test_stop_waits_for_in_flight_request() {
    let (mut server, request) = start_with_request_in_flight(Duration::from_millis(500)).await;

    let started = Instant::now();
    server
        .stop(Instant::now() + Duration::from_secs(5))
        .await
        .expect("in-flight request should finish before the deadline");

    assert!(
        started.elapsed() >= Duration::from_millis(300),
        "stop should have waited for the slow request"
    );
    let status = request
        .await
        .expect("request task panicked")
        .expect("in-flight request should complete");
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_stop_returns_error_when_deadline_elapses_during_shutdown() {
    let (mut server, _request) = start_with_request_in_flight(Duration::from_secs(3)).await;

    let started = Instant::now();
    let result = server.stop(Instant::now() + Duration::from_millis(300)).await;
    let elapsed = started.elapsed();

    assert!(
        matches!(result, Err(ProbeError::DeadlineExceeded)),
        "expected DeadlineExceeded, got {:?}",
        result
    );
    assert!(elapsed >= Duration::from_millis(250), "stop returned too early: {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(2), "stop overran its deadline: {:?}", elapsed);
    assert!(server.local_addr().is_none());
}

#[tokio::test]
async fn test_stop_before_start_is_noop() {
    let mut server = ProbeServer::new(loopback_config());

    let result = server.stop(Instant::now() + Duration::from_secs(1)).await;

    assert!(result.is_ok(), "stop before start should succeed: {:?}", result);
    assert!(server.local_addr().is_none());
}

#[tokio::test]
async fn test_stop_before_start_with_expired_deadline_is_noop() {
    let mut server = ProbeServer::new(loopback_config());

    assert!(server.stop(Instant::now()).await.is_ok());
}

#[tokio::test]
async fn test_start_returns_bound_address() {
    let mut server = ProbeServer::new(loopback_config());

    let addr = server.start().await.expect("start should succeed");

    assert_ne!(addr.port(), 0, "Ephemeral port should be resolved");
    assert_eq!(server.local_addr(), Some(addr));
}

#[tokio::test]
async fn test_start_twice_fails() {
    let mut server = ProbeServer::new(loopback_config());
    server.start().await.expect("first start should succeed");

    let result = server.start().await;

    assert!(matches!(result, Err(ProbeError::AlreadyStarted)));
}

#[tokio::test]
async fn test_start_after_stop_fails() {
    let mut server = ProbeServer::new(loopback_config());
    server.start().await.expect("start should succeed");
    server
        .stop(Instant::now() + Duration::from_secs(5))
        .await
        .expect("stop should succeed");

    assert!(matches!(
        server.start().await,
        Err(ProbeError::AlreadyStopped)
    ));
}

#[tokio::test]
async fn test_bind_conflict_reported_by_start() {
    let mut first = ProbeServer::new(loopback_config());
    let addr = first.start().await.expect("start should succeed");

    let mut second = ProbeServer::new(loopback_config().with_port(addr.port()));
    let result = second.start().await;

    assert!(
        matches!(result, Err(ProbeError::Bind { .. })),
        "Binding a used port should fail: {:?}",
        result
    );
}

#[tokio::test]
async fn test_graceful_stop_closes_listener() {
    let mut server = ProbeServer::new(loopback_config());
    let addr = server.start().await.expect("start should succeed");
    let url = format!("http://{}/liveness", addr);

    let response = reqwest::get(&url).await.expect("server should be serving");
    assert_eq!(response.status(), 200);
    drop(response);

    server
        .stop(Instant::now() + Duration::from_secs(5))
        .await
        .expect("graceful stop should finish before deadline");
    assert!(server.local_addr().is_none());

    let after = reqwest::Client::new()
        .get(&url)
        .timeout(Duration::from_millis(500))
        .send()
        .await;
    assert!(after.is_err(), "No connections should be accepted after stop");
}

#[tokio::test]
async fn test_stop_with_expired_deadline_returns_error() {
    let mut server = ProbeServer::new(loopback_config());
    server.start().await.expect("start should succeed");

    let result = tokio::time::timeout(Duration::from_secs(5), server.stop(Instant::now())).await;

    let result = result.expect("stop must not hang on an expired deadline");
    assert!(matches!(result, Err(ProbeError::DeadlineExceeded)));
}

#[tokio::test]
async fn test_stop_twice_is_noop() {
    let mut server = ProbeServer::new(loopback_config());
    server.start().await.expect("start should succeed");

    let deadline = Instant::now() + Duration::from_secs(5);
    server.stop(deadline).await.expect("first stop should succeed");

    assert!(server.stop(deadline).await.is_ok());
}

#[tokio::test]
async fn test_readiness_survives_lifecycle() {
    let mut server = ProbeServer::new(loopback_config());
    server.set_ready();
    server.start().await.expect("start should succeed");
    assert!(server.is_ready());

    server.set_not_ready();
    server
        .stop(Instant::now() + Duration::from_secs(5))
        .await
        .expect("stop should succeed");
    assert!(!server.is_ready());
}
