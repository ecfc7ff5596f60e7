//! Shared test fixtures: a scripted Greeter backend and router builders
//! that serve the production route/middleware stack against it.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tonic::Status;

use grpc_bridge_gateway::backend::{
    GreeterBackend, HelloReply, HelloRequest, ReplyStream, RequestStream,
};
use grpc_bridge_gateway::bridge::BridgeState;
use grpc_bridge_gateway::core::config::{BridgeConfig, CorsConfig, RateLimitConfig};
use grpc_bridge_gateway::gateway::build_router;
use grpc_bridge_gateway::middleware::RateLimiter;

/// In-process Greeter with the same reply shapes as the real backend
/// service, plus call counters so tests can assert what was (not)
/// reached.
#[derive(Default)]
pub struct MockGreeter {
    pub unary_calls: AtomicUsize,
    pub stream_calls: AtomicUsize,
}

#[async_trait]
impl GreeterBackend for MockGreeter {
    async fn say_hello(&self, request: HelloRequest) -> Result<HelloReply, Status> {
        self.unary_calls.fetch_add(1, Ordering::SeqCst);
        Ok(HelloReply {
            message: format!("Hello {}", request.name),
        })
    }

    async fn say_hello_server_stream(
        &self,
        request: HelloRequest,
    ) -> Result<ReplyStream, Status> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        let name = request.name;
        Ok(Box::pin(futures::stream::iter(
            (1..=5)
                .map(move |i| {
                    Ok(HelloReply {
                        message: format!("Hello {} - Message {} of 5", name, i),
                    })
                })
                .collect::<Vec<_>>(),
        )))
    }

    async fn say_hello_client_stream(
        &self,
        requests: RequestStream,
    ) -> Result<HelloReply, Status> {
        let names: Vec<String> = requests.map(|r| r.name).collect().await;
        Ok(HelloReply {
            message: format!(
                "Hello to all: {}! (Total: {} people)",
                names.join(", "),
                names.len()
            ),
        })
    }

    async fn say_hello_bidirectional(
        &self,
        requests: RequestStream,
    ) -> Result<ReplyStream, Status> {
        Ok(Box::pin(requests.map(|request| {
            Ok(HelloReply {
                message: format!("Echo: Hello {}!", request.name),
            })
        })))
    }
}

/// The production router over the given backend, with defaults
/// everywhere else.
pub fn router_with_backend(backend: Arc<dyn GreeterBackend>) -> axum::Router {
    router_with(backend, BridgeConfig::default(), RateLimitConfig::default())
}

pub fn router_with(
    backend: Arc<dyn GreeterBackend>,
    bridges: BridgeConfig,
    rate_limit: RateLimitConfig,
) -> axum::Router {
    build_router(
        BridgeState::new(backend, bridges),
        Arc::new(RateLimiter::new(&rate_limit)),
        &CorsConfig::default(),
    )
}

/// Bridge config with the unary endpoint switched on.
pub fn unary_enabled() -> BridgeConfig {
    BridgeConfig {
        unary_enabled: true,
        ..BridgeConfig::default()
    }
}
