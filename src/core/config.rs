//! # Configuration Module
//!
//! Configuration management for the gateway.
//!
//! ## Key Features
//! - YAML configuration parsing with serde
//! - Environment variable override support (`GATEWAY_*`)
//! - Defaults matching the original deployment (gateway on :8081,
//!   backend on localhost:8080, 100 req/s with a burst of 200)
//! - Validation with detailed error messages

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::core::error::{GatewayError, GatewayResult};

/// Main gateway configuration structure
///
/// Represents the complete configuration for the gateway. Every section
/// has a default so a partial YAML file (or none at all) is valid.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP listener configuration
    pub server: ServerConfig,

    /// Pooled gRPC backend connection configuration
    pub backend: BackendConfig,

    /// Per-identity rate limiting configuration
    pub rate_limit: RateLimitConfig,

    /// CORS / origin policy configuration
    pub cors: CorsConfig,

    /// Bridge-level switches and deadlines
    pub bridges: BridgeConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address for gateway routes
    pub bind_addr: SocketAddr,

    /// Grace period for draining in-flight requests at shutdown
    #[serde(with = "humantime_serde")]
    pub drain_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8081".parse().unwrap(),
            drain_grace: Duration::from_secs(10),
        }
    }
}

/// Pooled gRPC connection configuration
///
/// Keepalive and window settings mirror the original deployment: ping
/// every 30s, 5s ack timeout, pings permitted without active streams,
/// 1MiB initial windows, 4MiB message caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend target URI, e.g. `http://localhost:8080`
    pub target: String,

    /// Interval between HTTP/2 keepalive pings
    #[serde(with = "humantime_serde")]
    pub keepalive_interval: Duration,

    /// How long to wait for a keepalive ping acknowledgment
    #[serde(with = "humantime_serde")]
    pub keepalive_timeout: Duration,

    /// Send keepalive pings even when no streams are active
    pub keepalive_while_idle: bool,

    /// Initial HTTP/2 stream and connection flow-control window, in bytes
    pub initial_window_size: u32,

    /// Maximum send/receive message size, in bytes
    pub max_message_size: usize,

    /// Timeout for the initial dial
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            target: "http://localhost:8080".to_string(),
            keepalive_interval: Duration::from_secs(30),
            keepalive_timeout: Duration::from_secs(5),
            keepalive_while_idle: true,
            initial_window_size: 1 << 20,       // 1MiB
            max_message_size: 4 * 1024 * 1024,  // 4MiB
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Per-identity rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Token refill rate per identity, in tokens per second
    pub requests_per_second: u32,

    /// Burst capacity per identity
    pub burst_size: u32,

    /// Evict buckets idle longer than this. `None` keeps buckets for the
    /// process lifetime, matching the original gateway.
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub idle_eviction: Option<Duration>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 100,
            burst_size: 200,
            idle_eviction: None,
        }
    }
}

/// CORS / origin policy configuration
///
/// Loopback origins (any port) are admitted when `allow_loopback` is set;
/// `allowed_origins` adds a fixed set on top. The matched origin is
/// reflected back - never a wildcard, since credentials are allowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Exact origins admitted in addition to loopback
    pub allowed_origins: Vec<String>,

    /// Admit `http://localhost:*` and `http://127.0.0.1:*`
    pub allow_loopback: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allow_loopback: true,
        }
    }
}

/// Bridge-level switches and deadlines
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Whether the unary endpoint is administratively enabled. The
    /// original deployment ships with it disabled.
    pub unary_enabled: bool,

    /// Deadline for a unary backend call
    #[serde(with = "humantime_serde")]
    pub unary_timeout: Duration,

    /// Deadline covering a whole streaming session (server-stream and
    /// client-stream) - generous because these are interactive
    #[serde(with = "humantime_serde")]
    pub stream_timeout: Duration,

    /// Grace period for joining a bidirectional session's receive task
    #[serde(with = "humantime_serde")]
    pub session_join_grace: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            unary_enabled: false,
            unary_timeout: Duration::from_secs(5),
            stream_timeout: Duration::from_secs(30),
            session_join_grace: Duration::from_secs(2),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a YAML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> GatewayResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GatewayError::config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string and apply env overrides
    pub fn from_yaml(content: &str) -> GatewayResult<Self> {
        let mut config: GatewayConfig = serde_yaml::from_str(content)
            .map_err(|e| GatewayError::config(format!("Failed to parse config: {}", e)))?;

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    ///
    /// Environment variables follow the pattern: GATEWAY_<SECTION>_<FIELD>
    /// For example: GATEWAY_SERVER_BIND_ADDR=0.0.0.0:9000
    pub fn apply_env_overrides(&mut self) -> GatewayResult<()> {
        use std::env;

        if let Ok(addr) = env::var("GATEWAY_SERVER_BIND_ADDR") {
            self.server.bind_addr = addr
                .parse()
                .map_err(|e| GatewayError::config(format!("Invalid bind address '{}': {}", addr, e)))?;
        }

        if let Ok(target) = env::var("GATEWAY_BACKEND_TARGET") {
            self.backend.target = target;
        }

        if let Ok(rps) = env::var("GATEWAY_RATE_LIMIT_RPS") {
            self.rate_limit.requests_per_second = rps
                .parse()
                .map_err(|e| GatewayError::config(format!("Invalid rate limit '{}': {}", rps, e)))?;
        }

        if let Ok(burst) = env::var("GATEWAY_RATE_LIMIT_BURST") {
            self.rate_limit.burst_size = burst
                .parse()
                .map_err(|e| GatewayError::config(format!("Invalid burst size '{}': {}", burst, e)))?;
        }

        if let Ok(enabled) = env::var("GATEWAY_UNARY_ENABLED") {
            self.bridges.unary_enabled = enabled
                .parse()
                .map_err(|e| GatewayError::config(format!("Invalid unary flag '{}': {}", enabled, e)))?;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> GatewayResult<()> {
        if self.backend.target.is_empty() {
            return Err(GatewayError::config("Backend target must not be empty"));
        }

        if !self.backend.target.starts_with("http://") && !self.backend.target.starts_with("https://") {
            return Err(GatewayError::config(format!(
                "Backend target must be an http(s) URI, got '{}'",
                self.backend.target
            )));
        }

        if self.rate_limit.requests_per_second == 0 {
            return Err(GatewayError::config("Rate limit must be at least 1 request per second"));
        }

        if self.rate_limit.burst_size == 0 {
            return Err(GatewayError::config("Burst size must be at least 1"));
        }

        // A zero sweep interval would panic the sweeper's timer.
        if self.rate_limit.idle_eviction == Some(Duration::ZERO) {
            return Err(GatewayError::config(
                "Idle eviction interval must be non-zero when set",
            ));
        }

        if self.backend.max_message_size == 0 {
            return Err(GatewayError::config("Max message size must be non-zero"));
        }

        Ok(())
    }
}
