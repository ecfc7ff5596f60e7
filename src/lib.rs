//! # gRPC Bridge Gateway - Core Library Crate
//!
//! A browser-facing HTTP gateway that bridges browser-native transports
//! (HTTP request/response, Server-Sent Events, WebSocket) to the four gRPC
//! streaming shapes exposed by a back-end Greeter service.
//!
//! ## Architecture Overview
//!
//! The gateway is built around a small number of core modules:
//! - `core`: error types, configuration, and the transient wire envelopes
//! - `backend`: the pooled gRPC connection and the typed Greeter stubs
//! - `middleware`: rate limiting, CORS, and request logging (compression
//!   is a tower-http layer attached per-route in `gateway::server`)
//! - `bridge`: the four protocol bridges (unary, server-stream,
//!   client-stream, bidirectional) - the core translation logic
//! - `gateway`: the lifecycle controller that wires routes, middleware,
//!   and graceful shutdown together
//!
//! Control flow: an inbound request enters the listener, passes through
//! rate limiting, compression, CORS, and logging, reaches the appropriate
//! bridge, and the bridge invokes the shared backend connection. All four
//! bridges borrow one pooled connection; none of them own it.

/// Error types, configuration, and wire envelopes shared across the gateway
pub mod core;

/// Pooled gRPC connection management and the typed Greeter client stubs
pub mod backend;

/// Cross-cutting request policies: admission, compression, origin policy, logging
pub mod middleware;

/// The four protocol bridges translating browser transports to gRPC shapes
pub mod bridge;

/// Gateway server: route registration, middleware chains, graceful shutdown
pub mod gateway;

// Re-export commonly used types so binaries and tests can import them
// directly from the crate root.
pub use crate::core::config::GatewayConfig;
pub use crate::core::error::{GatewayError, GatewayResult};
pub use crate::gateway::server::GatewayServer;
