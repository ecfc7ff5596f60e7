//! Unary bridge: one JSON request in, one JSON reply out.
//!
//! The endpoint is administratively disabled by default, matching the
//! original deployment: the code path stays wired up and routable, but
//! every request is answered with a fixed 503 body regardless of what
//! the body contains, and the backend is never consulted. Flipping
//! `bridges.unary_enabled` restores normal service without a code
//! change.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::backend::HelloRequest;
use crate::core::error::GatewayError;
use crate::core::types::{UnaryRequest, UnaryResponse};

use super::BridgeState;

/// POST /api/unary
///
/// The body is taken as a rejection-capable extractor so the disabled
/// check runs before the parse outcome matters: the extractor still
/// buffers and parses the body, but a disabled endpoint discards the
/// result and answers 503 even for malformed input.
pub async fn handle_unary(
    State(state): State<BridgeState>,
    payload: Result<Json<UnaryRequest>, JsonRejection>,
) -> Response {
    if !state.bridges.unary_enabled {
        info!("⛔ Unary API access blocked - service disabled");
        return unary_disabled_response();
    }

    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return GatewayError::validation(rejection.body_text()).into_response();
        }
    };

    info!(name = %request.name, "Unary request");

    let deadline = state.bridges.unary_timeout;
    let call = state.backend.say_hello(HelloRequest { name: request.name });

    match timeout(deadline, call).await {
        Ok(Ok(reply)) => Json(UnaryResponse {
            message: reply.message,
        })
        .into_response(),
        Ok(Err(status)) => {
            warn!(code = ?status.code(), message = %status.message(), "Unary backend error");
            GatewayError::from(status).into_response()
        }
        Err(_) => {
            warn!(timeout_ms = deadline.as_millis() as u64, "Unary request timed out");
            GatewayError::Timeout {
                timeout_ms: deadline.as_millis() as u64,
            }
            .into_response()
        }
    }
}

/// The fixed disabled-service body. Stable wire contract: callers probe
/// this endpoint to detect whether unary access has been switched on.
fn unary_disabled_response() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "error": "Service Unavailable",
            "message": "Unary API endpoint has been disabled",
            "status": "503",
        })),
    )
        .into_response()
}
