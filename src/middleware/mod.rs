//! Cross-cutting request policies applied in front of the bridges.
//!
//! Chain order per route: admission (rate limiting) first, then origin
//! policy, request logging, compression (discrete routes only), and
//! finally the bridge itself. Compression is tower-http's
//! `CompressionLayer`, attached per-route in `gateway::server`.

pub mod cors;
pub mod rate_limiting;
pub mod request_logging;

pub use rate_limiting::{rate_limit_middleware, RateLimiter};
