//! # Rate Limiting
//!
//! Per-identity token-bucket admission control, applied before any other
//! work. Defaults match the original gateway: 100 tokens/second with a
//! burst of 200 per identity.
//!
//! ## Identity derivation
//! The client identity is the `X-Forwarded-For` header when present,
//! otherwise the transport-level peer address. Trusting the forwarded
//! header unconditionally is a deliberate trust decision inherited from
//! the original gateway, not a security boundary: the header is
//! spoofable and a production deployment behind an untrusted edge should
//! revisit it.
//!
//! ## Concurrency
//! One bucket per identity, each behind its own `parking_lot::Mutex`, so
//! unrelated identities never contend. The identity->bucket map is a
//! `DashMap`, which only contends per-shard on first insertion; the read
//! path after creation is lock-free at the map level.
//!
//! Buckets live for the process lifetime by default (original behavior).
//! `sweep_idle` plus the optional background sweeper bound memory under
//! churny client populations when `idle_eviction` is configured.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::net::SocketAddr;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::core::config::RateLimitConfig;
use crate::core::error::GatewayError;

/// One token bucket: capped token count refilled at a fixed rate.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
    last_seen: Instant,
}

impl TokenBucket {
    /// New identities start with a full bucket, so a fresh client gets
    /// exactly `burst` instant admissions.
    fn new(burst: f64, now: Instant) -> Self {
        Self {
            tokens: burst,
            last_refill: now,
            last_seen: now,
        }
    }

    /// Refill by elapsed time (capped at burst), then try to take one token.
    fn allow_at(&mut self, now: Instant, rate: f64, burst: f64) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(burst);
        self.last_refill = now;
        self.last_seen = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Admission counters, mirrored into the snapshot type for reporting.
#[derive(Debug, Default)]
struct RateLimitMetrics {
    requests_allowed: AtomicU64,
    requests_denied: AtomicU64,
}

/// Snapshot of rate limiting metrics
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitMetricsSnapshot {
    pub requests_allowed: u64,
    pub requests_denied: u64,
}

/// Per-identity token bucket rate limiter.
pub struct RateLimiter {
    buckets: DashMap<String, Arc<Mutex<TokenBucket>>>,
    rate: f64,
    burst: f64,
    metrics: RateLimitMetrics,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            rate: f64::from(config.requests_per_second),
            burst: f64::from(config.burst_size),
            metrics: RateLimitMetrics::default(),
        }
    }

    /// Atomically check-and-decrement one token for this identity.
    pub fn allow(&self, identity: &str) -> bool {
        self.allow_at(identity, Instant::now())
    }

    /// Deterministic variant used by tests: the caller supplies the clock.
    pub fn allow_at(&self, identity: &str, now: Instant) -> bool {
        let bucket = self
            .buckets
            .entry(identity.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(TokenBucket::new(self.burst, now))))
            .clone();

        let allowed = bucket.lock().allow_at(now, self.rate, self.burst);

        if allowed {
            self.metrics.requests_allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.metrics.requests_denied.fetch_add(1, Ordering::Relaxed);
        }

        allowed
    }

    /// Evict buckets idle longer than `max_idle`. Returns how many were
    /// removed.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.lock().last_seen) <= max_idle);
        before - self.buckets.len()
    }

    /// Number of tracked identities.
    pub fn tracked_identities(&self) -> usize {
        self.buckets.len()
    }

    pub fn metrics(&self) -> RateLimitMetricsSnapshot {
        RateLimitMetricsSnapshot {
            requests_allowed: self.metrics.requests_allowed.load(Ordering::Relaxed),
            requests_denied: self.metrics.requests_denied.load(Ordering::Relaxed),
        }
    }
}

/// Spawn the background idle-bucket sweeper.
///
/// Runs until aborted by the lifecycle controller at shutdown.
pub fn spawn_idle_sweeper(limiter: Arc<RateLimiter>, max_idle: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(max_idle);
        // The immediate first tick would sweep an empty map.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = limiter.sweep_idle(max_idle);
            if evicted > 0 {
                debug!(evicted, "Evicted idle rate-limit buckets");
            }
        }
    })
}

/// Derive the client identity for admission control.
///
/// Prefers `X-Forwarded-For`; falls back to the peer address recorded by
/// `into_make_service_with_connect_info`, then to a constant for
/// in-process test harnesses that do not carry connect info.
pub fn client_identity(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if !forwarded.is_empty() {
            return forwarded.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Admission middleware: denied requests receive 429 and never reach a
/// bridge.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let identity = client_identity(&request);

    if !limiter.allow(&identity) {
        warn!(
            identity = %identity,
            path = %request.uri().path(),
            "Rate limit exceeded"
        );
        return GatewayError::RateLimitExceeded.into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(rps: u32, burst: u32) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            requests_per_second: rps,
            burst_size: burst,
            idle_eviction: None,
        })
    }

    #[test]
    fn test_burst_is_exact() {
        let limiter = limiter(100, 5);
        let now = Instant::now();

        // Exactly B requests from a fresh identity succeed instantly.
        for i in 0..5 {
            assert!(limiter.allow_at("client-a", now), "request {} denied", i);
        }
        // The (B+1)th within the same instant is denied.
        assert!(!limiter.allow_at("client-a", now));
    }

    #[test]
    fn test_refill_rate() {
        let limiter = limiter(100, 5);
        let now = Instant::now();

        for _ in 0..5 {
            assert!(limiter.allow_at("client-a", now));
        }
        assert!(!limiter.allow_at("client-a", now));

        // After 1/R seconds exactly one more token is available.
        let later = now + Duration::from_millis(10);
        assert!(limiter.allow_at("client-a", later));
        assert!(!limiter.allow_at("client-a", later));
    }

    #[test]
    fn test_refill_capped_at_burst() {
        let limiter = limiter(100, 3);
        let now = Instant::now();
        assert!(limiter.allow_at("client-a", now));

        // A long quiet period must not accumulate beyond the burst cap.
        let much_later = now + Duration::from_secs(3600);
        for _ in 0..3 {
            assert!(limiter.allow_at("client-a", much_later));
        }
        assert!(!limiter.allow_at("client-a", much_later));
    }

    #[test]
    fn test_identities_are_independent() {
        let limiter = limiter(100, 2);
        let now = Instant::now();

        assert!(limiter.allow_at("client-a", now));
        assert!(limiter.allow_at("client-a", now));
        assert!(!limiter.allow_at("client-a", now));

        // Exhausting one identity leaves others untouched.
        assert!(limiter.allow_at("client-b", now));
        assert_eq!(limiter.tracked_identities(), 2);
    }

    #[test]
    fn test_metrics_count_decisions() {
        let limiter = limiter(100, 1);
        let now = Instant::now();

        assert!(limiter.allow_at("client-a", now));
        assert!(!limiter.allow_at("client-a", now));

        let snapshot = limiter.metrics();
        assert_eq!(snapshot.requests_allowed, 1);
        assert_eq!(snapshot.requests_denied, 1);
    }

    #[test]
    fn test_sweep_evicts_only_idle_buckets() {
        let limiter = limiter(100, 2);
        limiter.allow("client-a");
        limiter.allow("client-b");
        assert_eq!(limiter.tracked_identities(), 2);

        // Nothing has been idle for an hour.
        assert_eq!(limiter.sweep_idle(Duration::from_secs(3600)), 0);
        assert_eq!(limiter.tracked_identities(), 2);

        // With a zero idle bound everything is evictable.
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(limiter.sweep_idle(Duration::from_millis(1)), 2);
        assert_eq!(limiter.tracked_identities(), 0);
    }

    #[test]
    fn test_identity_prefers_forwarded_header() {
        let request = Request::builder()
            .uri("/api/unary")
            .header("x-forwarded-for", "203.0.113.9")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(client_identity(&request), "203.0.113.9");

        let request = Request::builder()
            .uri("/api/unary")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(client_identity(&request), "unknown");
    }
}
