//! Request logging: method, path, caller address, final status, and
//! wall-clock duration.
//!
//! The middleware logs after the inner handler has produced its response
//! head, so the status code is the one actually written. The body is
//! passed through untouched - streaming responses (SSE frames, WebSocket
//! upgrades) keep flushing incrementally through this wrapper.

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::info;

pub async fn request_logger(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    info!(
        method = %method,
        path = %path,
        remote_addr = %remote_addr,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Request processed"
    );

    response
}
