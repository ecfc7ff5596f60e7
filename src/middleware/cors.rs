//! CORS / origin policy.
//!
//! Loopback origins on any port (the browser dev servers of the original
//! deployment) plus a configurable fixed set are admitted. Because
//! credentials are allowed, the matched origin is reflected back rather
//! than answered with a wildcard: wildcard + credentials is invalid per
//! the CORS protocol. Preflight OPTIONS requests are answered by the
//! layer itself and never reach a bridge.

use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::core::config::CorsConfig;

/// Build the CORS layer for the gateway router.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let policy = config.clone();

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            origin_allowed(origin, &policy)
        }))
        .allow_methods([
            Method::POST,
            Method::GET,
            Method::OPTIONS,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
            header::ACCEPT,
            header::ORIGIN,
        ])
        .allow_credentials(true)
        .expose_headers([header::CONTENT_LENGTH, header::CONTENT_TYPE])
}

/// Whether `origin` may receive responses from this gateway.
pub fn origin_allowed(origin: &HeaderValue, config: &CorsConfig) -> bool {
    let Ok(origin) = origin.to_str() else {
        return false;
    };

    if config.allow_loopback
        && (origin.starts_with("http://localhost:") || origin.starts_with("http://127.0.0.1:"))
    {
        return true;
    }

    config.allowed_origins.iter().any(|allowed| allowed == origin)
}
