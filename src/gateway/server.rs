//! # Gateway Server
//!
//! Assembles the router, owns the backend connection and the rate
//! limiter, and drives the serve/shutdown lifecycle.
//!
//! ## Route layout
//!
//! | Route                 | Method | Bridge            | Compressed |
//! |-----------------------|--------|-------------------|------------|
//! | `/api/unary`          | POST   | unary             | yes        |
//! | `/api/client-stream`  | POST   | client streaming  | yes        |
//! | `/api/server-stream`  | GET    | server streaming  | no         |
//! | `/api/bidirectional`  | GET    | bidirectional WS  | no         |
//! | `/health`             | GET    | liveness probe    | yes        |
//!
//! Compression is attached only to the discrete routes: compressing an
//! SSE body would buffer frames in the encoder and destroy incremental
//! delivery, and a WebSocket upgrade has no HTTP body to compress.
//!
//! ## Middleware order
//!
//! Admission control runs outermost so over-limit traffic is rejected
//! before any other work, including on `/health`. Then origin policy,
//! then request logging, then the route itself.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;
use tracing::{info, warn};

use crate::backend::BackendConnection;
use crate::bridge::{self, BridgeState};
use crate::core::config::{CorsConfig, GatewayConfig};
use crate::core::error::GatewayResult;
use crate::middleware::cors::cors_layer;
use crate::middleware::rate_limiting::{
    rate_limit_middleware, spawn_idle_sweeper, RateLimiter,
};
use crate::middleware::request_logging::request_logger;

/// Build the complete gateway router.
///
/// Exposed separately from [`GatewayServer`] so tests can serve the
/// exact production route/middleware stack against a mock backend.
pub fn build_router(
    bridge_state: BridgeState,
    rate_limiter: Arc<RateLimiter>,
    cors: &CorsConfig,
) -> Router {
    let discrete = Router::new()
        .route("/api/unary", post(bridge::unary::handle_unary))
        .route(
            "/api/client-stream",
            post(bridge::client_stream::handle_client_stream),
        )
        .route("/health", get(health))
        .layer(CompressionLayer::new());

    let streaming = Router::new()
        .route(
            "/api/server-stream",
            get(bridge::server_stream::handle_server_stream),
        )
        .route(
            "/api/bidirectional",
            get(bridge::bidirectional::handle_bidirectional),
        );

    discrete
        .merge(streaming)
        .with_state(bridge_state)
        .layer(middleware::from_fn(request_logger))
        .layer(cors_layer(cors))
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ))
}

/// GET /health - liveness only. Backend reachability is deliberately not
/// probed here: the gateway is alive even when the backend is down, and
/// per-request errors already surface backend failures.
async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "grpc-bridge-gateway",
        })),
    )
}

/// The running gateway: one backend connection, one listener, one
/// shutdown token.
pub struct GatewayServer {
    config: GatewayConfig,
    connection: Arc<BackendConnection>,
    rate_limiter: Arc<RateLimiter>,
    shutdown: CancellationToken,
}

impl GatewayServer {
    /// Dial the backend and prepare the server. Connection failure is
    /// fatal: a gateway that cannot reach its only backend has nothing
    /// to serve.
    pub async fn connect(config: GatewayConfig) -> GatewayResult<Self> {
        config.validate()?;

        let connection = Arc::new(BackendConnection::connect(&config.backend).await?);
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        Ok(Self {
            config,
            connection,
            rate_limiter,
            shutdown: CancellationToken::new(),
        })
    }

    /// Token that stops the server when cancelled. Safe to clone into
    /// signal handlers; cancelling twice is harmless.
    pub fn shutdown_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Serve until the shutdown token fires, then drain in-flight
    /// connections for at most the configured grace period before
    /// releasing the backend connection.
    pub async fn run(self) -> GatewayResult<()> {
        let bridge_state = BridgeState::new(
            self.connection.backend(),
            self.config.bridges.clone(),
        );
        let app = build_router(
            bridge_state,
            self.rate_limiter.clone(),
            &self.config.cors,
        )
        .into_make_service_with_connect_info::<SocketAddr>();

        let listener = TcpListener::bind(self.config.server.bind_addr).await?;
        info!(addr = %self.config.server.bind_addr, "🚀 gRPC bridge gateway listening");

        let sweeper = self
            .config
            .rate_limit
            .idle_eviction
            .map(|max_idle| spawn_idle_sweeper(self.rate_limiter.clone(), max_idle));

        let graceful = self.shutdown.clone();
        let server = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                graceful.cancelled().await;
                info!("🛑 Shutdown signal received, draining connections");
            })
            .into_future();

        // Long-lived streams (SSE, WebSocket) would otherwise hold the
        // drain open indefinitely; the grace period bounds it.
        let drain_deadline = async {
            self.shutdown.cancelled().await;
            tokio::time::sleep(self.config.server.drain_grace).await;
        };

        tokio::select! {
            result = server => result?,
            _ = drain_deadline => {
                warn!(
                    grace_ms = self.config.server.drain_grace.as_millis() as u64,
                    "⚠️ Drain grace period elapsed, abandoning remaining connections"
                );
            }
        }

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }
        self.connection.close();
        info!("✅ Gateway server stopped");
        Ok(())
    }
}
