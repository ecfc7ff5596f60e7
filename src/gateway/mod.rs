//! Server assembly and lifecycle.

pub mod server;

pub use server::{build_router, GatewayServer};
