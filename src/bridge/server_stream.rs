//! Server-streaming bridge: one request in, an SSE stream of replies out.
//!
//! Replies are forwarded strictly in arrival order with at most one
//! message in flight: the backend stream is only polled again after the
//! previous frame has been yielded to the SSE encoder, so a slow
//! consumer exerts backpressure on the backend through HTTP/2 flow
//! control instead of unbounded buffering in the gateway.
//!
//! Cancellation is by drop: when the client disconnects, axum drops the
//! SSE body, which drops the backend reply stream, which resets the
//! underlying HTTP/2 stream and cancels the RPC.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use futures::Stream;
use futures::StreamExt;
use serde_json::json;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::backend::{HelloRequest, ReplyStream};
use crate::core::error::GatewayError;
use crate::core::types::{ServerStreamParams, UnaryResponse};

use super::BridgeState;

/// GET /api/server-stream?name=...
///
/// Errors before the first frame surface as a regular HTTP error
/// response. Once streaming has begun the status line is already on the
/// wire, so later failures become terminal `error` events instead.
pub async fn handle_server_stream(
    State(state): State<BridgeState>,
    Query(params): Query<ServerStreamParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, GatewayError> {
    let name = params.name.unwrap_or_else(|| "Guest".to_string());
    info!(name = %name, "Server streaming request");

    let upstream = state
        .backend
        .say_hello_server_stream(HelloRequest { name })
        .await
        .map_err(GatewayError::from)?;

    Ok(Sse::new(sse_bridge(upstream, state.bridges.stream_timeout)))
}

/// Pump one backend reply stream into SSE events under an overall
/// deadline.
///
/// Terminal frames, exactly one of which ends every stream:
/// - `event: done` after clean backend completion
/// - `event: error` after a mid-stream backend error or deadline expiry
pub(crate) fn sse_bridge(
    mut upstream: ReplyStream,
    deadline: Duration,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let started = Instant::now();

        loop {
            let remaining = deadline.saturating_sub(started.elapsed());
            let next = match timeout(remaining, upstream.next()).await {
                Ok(next) => next,
                Err(_) => {
                    warn!(deadline_ms = deadline.as_millis() as u64, "Server stream deadline exceeded");
                    yield Ok(error_event("stream deadline exceeded"));
                    break;
                }
            };

            match next {
                Some(Ok(reply)) => {
                    debug!(message = %reply.message, "Forwarding stream message");
                    match Event::default().json_data(UnaryResponse { message: reply.message }) {
                        Ok(event) => yield Ok(event),
                        Err(e) => {
                            warn!(error = %e, "Failed to encode SSE frame");
                            yield Ok(error_event("failed to encode reply"));
                            break;
                        }
                    }
                }
                Some(Err(status)) => {
                    warn!(code = ?status.code(), message = %status.message(), "Stream receive error");
                    yield Ok(error_event(status.message()));
                    break;
                }
                None => {
                    debug!("Backend stream complete");
                    yield Ok(done_event());
                    break;
                }
            }
        }
    }
}

fn done_event() -> Event {
    Event::default()
        .event("done")
        .data(r#"{"message": "Stream complete"}"#)
}

fn error_event(message: &str) -> Event {
    Event::default()
        .event("error")
        .data(json!({ "error": message }).to_string())
}
