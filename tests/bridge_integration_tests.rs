//! End-to-end tests for the HTTP-facing bridges, served through the
//! full production router (rate limiting, CORS, logging, compression)
//! against a scripted backend.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use common::{router_with, router_with_backend, unary_enabled, MockGreeter};
use grpc_bridge_gateway::core::config::RateLimitConfig;

#[tokio::test]
async fn test_health_endpoint_reports_healthy() {
    let server = TestServer::new(router_with_backend(Arc::new(MockGreeter::default()))).unwrap();

    let response = server.get("/health").await;
    response.assert_status(StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_unary_disabled_returns_fixed_body_and_skips_backend() {
    let backend = Arc::new(MockGreeter::default());
    let server = TestServer::new(router_with_backend(backend.clone())).unwrap();

    let response = server.post("/api/unary").json(&json!({"name": "Alice"})).await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = response.json();
    assert_eq!(body["error"], "Service Unavailable");
    assert_eq!(body["message"], "Unary API endpoint has been disabled");
    assert_eq!(body["status"], "503");

    // The backend was never consulted.
    assert_eq!(backend.unary_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unary_disabled_even_for_malformed_body() {
    let backend = Arc::new(MockGreeter::default());
    let server = TestServer::new(router_with_backend(backend.clone())).unwrap();

    let response = server
        .post("/api/unary")
        .content_type("application/json")
        .text("this is not json")
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(backend.unary_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unary_enabled_round_trip() {
    let backend = Arc::new(MockGreeter::default());
    let server = TestServer::new(router_with(
        backend.clone(),
        unary_enabled(),
        RateLimitConfig::default(),
    ))
    .unwrap();

    let response = server.post("/api/unary").json(&json!({"name": "Alice"})).await;
    response.assert_status(StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["message"], "Hello Alice");
    assert_eq!(backend.unary_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unary_enabled_rejects_malformed_body() {
    let backend = Arc::new(MockGreeter::default());
    let server = TestServer::new(router_with(
        backend.clone(),
        unary_enabled(),
        RateLimitConfig::default(),
    ))
    .unwrap();

    let response = server
        .post("/api/unary")
        .content_type("application/json")
        .text("{broken")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(backend.unary_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_server_stream_delivers_frames_in_order_then_done() {
    let server = TestServer::new(router_with_backend(Arc::new(MockGreeter::default()))).unwrap();

    let response = server
        .get("/api/server-stream")
        .add_query_param("name", "Bob")
        .await;
    response.assert_status(StatusCode::OK);

    let body = response.text();

    // All five frames, in order, before the terminal marker.
    let mut last = 0;
    for i in 1..=5 {
        let frame = format!("Hello Bob - Message {} of 5", i);
        let pos = body.find(&frame).unwrap_or_else(|| panic!("missing frame {}", i));
        assert!(pos > last || i == 1, "frame {} out of order", i);
        last = pos;
    }

    let done = body.find("event: done").expect("missing done marker");
    assert!(done > last, "done marker must come after all frames");
    assert!(body.contains(r#"{"message": "Stream complete"}"#));
}

#[tokio::test]
async fn test_server_stream_defaults_name_to_guest() {
    let server = TestServer::new(router_with_backend(Arc::new(MockGreeter::default()))).unwrap();

    let response = server.get("/api/server-stream").await;
    response.assert_status(StatusCode::OK);
    assert!(response.text().contains("Hello Guest - Message 1 of 5"));
}

#[tokio::test]
async fn test_client_stream_aggregates_in_array_order() {
    let server = TestServer::new(router_with_backend(Arc::new(MockGreeter::default()))).unwrap();

    let response = server
        .post("/api/client-stream")
        .json(&json!(["Alice", "Bob", "Charlie"]))
        .await;
    response.assert_status(StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(
        body["message"],
        "Hello to all: Alice, Bob, Charlie! (Total: 3 people)"
    );
}

#[tokio::test]
async fn test_client_stream_empty_batch_is_forwarded() {
    let server = TestServer::new(router_with_backend(Arc::new(MockGreeter::default()))).unwrap();

    let response = server.post("/api/client-stream").json(&json!([])).await;
    response.assert_status(StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["message"], "Hello to all: ! (Total: 0 people)");
}

#[tokio::test]
async fn test_client_stream_rejects_non_array_body() {
    let server = TestServer::new(router_with_backend(Arc::new(MockGreeter::default()))).unwrap();

    let response = server
        .post("/api/client-stream")
        .json(&json!({"name": "Alice"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["error"], "Bad Request");
}

#[tokio::test]
async fn test_backend_error_maps_to_http_status() {
    use async_trait::async_trait;
    use grpc_bridge_gateway::backend::{
        GreeterBackend, HelloReply, HelloRequest, ReplyStream, RequestStream,
    };
    use tonic::Status;

    struct DownBackend;

    #[async_trait]
    impl GreeterBackend for DownBackend {
        async fn say_hello(&self, _request: HelloRequest) -> Result<HelloReply, Status> {
            Err(Status::unavailable("connection refused"))
        }

        async fn say_hello_server_stream(
            &self,
            _request: HelloRequest,
        ) -> Result<ReplyStream, Status> {
            Err(Status::unavailable("connection refused"))
        }

        async fn say_hello_client_stream(
            &self,
            _requests: RequestStream,
        ) -> Result<HelloReply, Status> {
            Err(Status::unavailable("connection refused"))
        }

        async fn say_hello_bidirectional(
            &self,
            _requests: RequestStream,
        ) -> Result<ReplyStream, Status> {
            Err(Status::unavailable("connection refused"))
        }
    }

    let server = TestServer::new(router_with(
        Arc::new(DownBackend),
        unary_enabled(),
        RateLimitConfig::default(),
    ))
    .unwrap();

    // Unavailable maps to 503 on every discrete bridge, and on the
    // server-stream bridge when the failure precedes the first frame.
    let response = server.post("/api/unary").json(&json!({"name": "Alice"})).await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let response = server.post("/api/client-stream").json(&json!(["Alice"])).await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let response = server.get("/api/server-stream").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}
