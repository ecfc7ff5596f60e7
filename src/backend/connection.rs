//! Pooled gRPC connection management: establish once, reuse always,
//! close once.
//!
//! The gateway process owns exactly one `BackendConnection`. It is
//! created at startup (fatally failing the process if the initial dial
//! fails), borrowed by every bridge for the lifetime of the process, and
//! closed exactly once after the HTTP side has drained. There is no
//! retry at this layer: once established, the tonic channel reconnects
//! transparently after transient loss.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info};

use crate::core::config::BackendConfig;
use crate::core::error::{GatewayError, GatewayResult};

/// One long-lived handle to the gRPC backend.
pub struct BackendConnection {
    backend: Arc<GrpcBackend>,
    closed: AtomicBool,
}

/// The shared channel plus the call options every stub is built with.
pub struct GrpcBackend {
    channel: Channel,
    max_message_size: usize,
}

impl GrpcBackend {
    pub(crate) fn channel(&self) -> Channel {
        self.channel.clone()
    }

    pub(crate) fn max_message_size(&self) -> usize {
        self.max_message_size
    }
}

impl BackendConnection {
    /// Dial the backend with connection pooling and keepalive.
    ///
    /// Keepalive pings every `keepalive_interval` with a
    /// `keepalive_timeout` ack deadline, pings permitted without active
    /// streams, and 1MiB initial flow-control windows. A dial failure
    /// here is fatal to the caller: the gateway must not serve traffic
    /// without its pooled connection.
    pub async fn connect(config: &BackendConfig) -> GatewayResult<Self> {
        let endpoint = Endpoint::from_shared(config.target.clone())
            .map_err(|e| {
                GatewayError::config(format!("Invalid backend target '{}': {}", config.target, e))
            })?
            .connect_timeout(config.connect_timeout)
            .http2_keep_alive_interval(config.keepalive_interval)
            .keep_alive_timeout(config.keepalive_timeout)
            .keep_alive_while_idle(config.keepalive_while_idle)
            .initial_stream_window_size(config.initial_window_size)
            .initial_connection_window_size(config.initial_window_size);

        let channel = endpoint.connect().await.map_err(|e| {
            GatewayError::service_unavailable("greeter", &format!("dial {}: {}", config.target, e))
        })?;

        info!("✅ gRPC connection established with connection pooling");

        Ok(Self {
            backend: Arc::new(GrpcBackend {
                channel,
                max_message_size: config.max_message_size,
            }),
            closed: AtomicBool::new(false),
        })
    }

    /// The shared stub factory handed to every bridge.
    pub fn backend(&self) -> Arc<GrpcBackend> {
        self.backend.clone()
    }

    /// Release the pooled connection.
    ///
    /// Exactly-once semantics: the first call logs the release, any
    /// further call is a no-op. The lifecycle controller drains HTTP
    /// work before calling this, so no in-flight bridge observes a
    /// closed channel.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("gRPC connection already closed; ignoring");
            return;
        }
        info!("✅ gRPC connection closed gracefully");
    }

    /// Whether `close` has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
