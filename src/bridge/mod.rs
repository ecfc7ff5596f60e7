//! # Protocol Bridges
//!
//! The core translation logic: one bridge per gRPC call shape, each
//! mapping a browser-native transport onto the backend stream model
//! while preserving message order and cancellation semantics.
//!
//! - `unary`: buffered HTTP request/response <-> unary call
//! - `server_stream`: Server-Sent Events <-> server-streaming call
//! - `client_stream`: buffered JSON batch <-> client-streaming call
//! - `bidirectional`: WebSocket <-> bidirectional-streaming call
//!
//! Every bridge borrows the shared backend through `BridgeState`; none
//! of them retries a failed call - retry policy belongs to the caller or
//! to the transport's own reconnection logic.

pub mod bidirectional;
pub mod client_stream;
pub mod server_stream;
pub mod unary;

use std::sync::Arc;

use crate::backend::GreeterBackend;
use crate::core::config::BridgeConfig;

/// Dependencies shared by the four bridges, constructed once at startup
/// and cloned into every handler. Holding the backend as a trait object
/// lets tests wire in isolated mock instances.
#[derive(Clone)]
pub struct BridgeState {
    pub backend: Arc<dyn GreeterBackend>,
    pub bridges: BridgeConfig,
}

impl BridgeState {
    pub fn new(backend: Arc<dyn GreeterBackend>, bridges: BridgeConfig) -> Self {
        Self { backend, bridges }
    }
}
