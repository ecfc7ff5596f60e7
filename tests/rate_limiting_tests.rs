//! Rate limiting behavior through the full router: admission happens
//! before any bridge, identities are independent, and denials carry the
//! gateway's JSON error body.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use http::{HeaderName, HeaderValue};
use serde_json::Value;

use common::{router_with, MockGreeter};
use grpc_bridge_gateway::core::config::{BridgeConfig, RateLimitConfig};

fn forwarded() -> HeaderName {
    HeaderName::from_static("x-forwarded-for")
}

fn tight_limits(burst: u32) -> RateLimitConfig {
    RateLimitConfig {
        requests_per_second: 1,
        burst_size: burst,
        idle_eviction: None,
    }
}

#[tokio::test]
async fn test_burst_exhaustion_yields_429() {
    let server = TestServer::new(router_with(
        Arc::new(MockGreeter::default()),
        BridgeConfig::default(),
        tight_limits(3),
    ))
    .unwrap();

    // Exactly the burst worth of requests is admitted.
    for _ in 0..3 {
        let response = server
            .get("/health")
            .add_header(forwarded(), HeaderValue::from_static("203.0.113.5"))
            .await;
        response.assert_status(StatusCode::OK);
    }

    let response = server
        .get("/health")
        .add_header(forwarded(), HeaderValue::from_static("203.0.113.5"))
        .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);

    let body: Value = response.json();
    assert_eq!(body["error"], "Too Many Requests");
    assert_eq!(body["status"], "429");
}

#[tokio::test]
async fn test_identities_do_not_share_buckets() {
    let server = TestServer::new(router_with(
        Arc::new(MockGreeter::default()),
        BridgeConfig::default(),
        tight_limits(2),
    ))
    .unwrap();

    for _ in 0..2 {
        server
            .get("/health")
            .add_header(forwarded(), HeaderValue::from_static("203.0.113.5"))
            .await
            .assert_status(StatusCode::OK);
    }
    server
        .get("/health")
        .add_header(forwarded(), HeaderValue::from_static("203.0.113.5"))
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);

    // A different identity still has a full bucket.
    server
        .get("/health")
        .add_header(forwarded(), HeaderValue::from_static("198.51.100.7"))
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_denied_requests_never_reach_bridges() {
    use std::sync::atomic::Ordering;

    let backend = Arc::new(MockGreeter::default());
    let server = TestServer::new(router_with(
        backend.clone(),
        BridgeConfig::default(),
        tight_limits(1),
    ))
    .unwrap();

    // First request consumes the bucket on the stream route.
    server
        .get("/api/server-stream")
        .add_header(forwarded(), HeaderValue::from_static("203.0.113.5"))
        .await
        .assert_status(StatusCode::OK);

    let response = server
        .get("/api/server-stream")
        .add_header(forwarded(), HeaderValue::from_static("203.0.113.5"))
        .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);

    assert_eq!(backend.stream_calls.load(Ordering::SeqCst), 1);
}
