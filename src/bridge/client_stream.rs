//! Client-streaming bridge: a buffered JSON batch in, one reply out.
//!
//! The HTTP side has no incremental upload protocol here, so the whole
//! batch arrives as a JSON array of names, is replayed to the backend as
//! a client stream in array order, and the single summarizing reply
//! comes back as the HTTP response.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::backend::{HelloRequest, RequestStream};
use crate::core::error::GatewayError;
use crate::core::types::UnaryResponse;

use super::BridgeState;

/// POST /api/client-stream with body `["Alice", "Bob", ...]`.
///
/// An empty array is forwarded as an empty stream; what that means is
/// the backend's decision, not the gateway's.
pub async fn handle_client_stream(
    State(state): State<BridgeState>,
    payload: Result<Json<Vec<String>>, JsonRejection>,
) -> Response {
    let Json(names) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return GatewayError::validation(rejection.body_text()).into_response();
        }
    };

    info!(count = names.len(), "Client streaming request");

    let requests: Vec<HelloRequest> = names
        .into_iter()
        .map(|name| HelloRequest { name })
        .collect();
    let outbound: RequestStream = Box::pin(futures::stream::iter(requests));

    let deadline = state.bridges.stream_timeout;
    let call = state.backend.say_hello_client_stream(outbound);

    match timeout(deadline, call).await {
        Ok(Ok(reply)) => Json(UnaryResponse {
            message: reply.message,
        })
        .into_response(),
        Ok(Err(status)) => {
            warn!(code = ?status.code(), message = %status.message(), "Client stream backend error");
            GatewayError::from(status).into_response()
        }
        Err(_) => {
            warn!(timeout_ms = deadline.as_millis() as u64, "Client stream timed out");
            GatewayError::Timeout {
                timeout_ms: deadline.as_millis() as u64,
            }
            .into_response()
        }
    }
}
