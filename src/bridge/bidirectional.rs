//! Bidirectional bridge: one WebSocket connection per backend stream.
//!
//! Each accepted socket becomes an isolated session: one RPC stream, a
//! send loop on the session task, and a spawned receive task. The two
//! directions are independent except at shutdown, where the send loop's
//! exit cancels the receive task and joins it under a bounded grace
//! period so a stuck backend read can never leak the session.
//!
//! The transport is abstracted behind `SessionSink`/`SessionSource` so
//! the session logic runs unchanged over an in-process channel pair in
//! tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::backend::{GreeterBackend, HelloRequest, ReplyStream};
use crate::core::error::{GatewayError, GatewayResult};
use crate::core::types::{ClientFrame, ServerFrame};

use super::BridgeState;

/// Outbound half of a session transport.
///
/// Shared between the session task and the receive task, so writes are
/// serialized internally by the implementation.
#[async_trait]
pub trait SessionSink: Send + Sync {
    async fn send_frame(&self, frame: ServerFrame) -> GatewayResult<()>;
}

/// Inbound half of a session transport. `None` means the peer closed
/// cleanly; `Some(Err(..))` is a decode failure or an abrupt transport
/// error.
#[async_trait]
pub trait SessionSource: Send {
    async fn next_frame(&mut self) -> Option<GatewayResult<ClientFrame>>;
}

struct WsSink {
    inner: tokio::sync::Mutex<SplitSink<WebSocket, Message>>,
}

#[async_trait]
impl SessionSink for WsSink {
    async fn send_frame(&self, frame: ServerFrame) -> GatewayResult<()> {
        let text = serde_json::to_string(&frame)?;
        self.inner
            .lock()
            .await
            .send(Message::Text(text))
            .await
            .map_err(GatewayError::from)
    }
}

struct WsSource {
    inner: SplitStream<WebSocket>,
}

#[async_trait]
impl SessionSource for WsSource {
    async fn next_frame(&mut self) -> Option<GatewayResult<ClientFrame>> {
        loop {
            let message = match self.inner.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => return Some(Err(GatewayError::from(e))),
                None => return None,
            };

            match message {
                Message::Text(text) => {
                    return Some(serde_json::from_str(&text).map_err(GatewayError::from));
                }
                Message::Binary(bytes) => {
                    return Some(serde_json::from_slice(&bytes).map_err(GatewayError::from));
                }
                Message::Close(_) => return None,
                // Pings are answered by axum itself.
                Message::Ping(_) | Message::Pong(_) => continue,
            }
        }
    }
}

/// GET /api/bidirectional (WebSocket upgrade)
pub async fn handle_bidirectional(
    State(state): State<BridgeState>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let session_id = Uuid::new_v4();
        info!(%session_id, "✅ WebSocket connection established");

        let (sink, source) = socket.split();
        let session = StreamSession::new(state.backend.clone(), state.bridges.session_join_grace);
        session
            .run(
                session_id,
                Arc::new(WsSink {
                    inner: tokio::sync::Mutex::new(sink),
                }),
                WsSource { inner: source },
            )
            .await;

        info!(%session_id, "WebSocket connection closed");
    })
}

/// One live bidirectional session.
pub struct StreamSession {
    backend: Arc<dyn GreeterBackend>,
    join_grace: Duration,
}

impl StreamSession {
    pub fn new(backend: Arc<dyn GreeterBackend>, join_grace: Duration) -> Self {
        Self {
            backend,
            join_grace,
        }
    }

    /// Drive the session to completion over the given transport halves.
    ///
    /// Ordering contract: the backend stream is opened before the
    /// connected ack is sent, so the ack really means "the backend
    /// stream is ready", and it is always the first frame the peer sees.
    pub async fn run(
        &self,
        session_id: Uuid,
        sink: Arc<dyn SessionSink>,
        mut source: impl SessionSource,
    ) {
        let (req_tx, req_rx) = mpsc::channel::<HelloRequest>(16);
        let outbound = Box::pin(ReceiverStream::new(req_rx));

        let replies = match self.backend.say_hello_bidirectional(outbound).await {
            Ok(replies) => replies,
            Err(status) => {
                error!(%session_id, code = ?status.code(), message = %status.message(), "❌ Failed to create gRPC stream");
                let _ = sink
                    .send_frame(ServerFrame::error(format!(
                        "Failed to connect to gRPC server: {}",
                        status.message()
                    )))
                    .await;
                return;
            }
        };
        debug!(%session_id, "✅ gRPC bidirectional stream created");

        if let Err(e) = sink
            .send_frame(ServerFrame::message("Connected to server!"))
            .await
        {
            warn!(%session_id, error = %e, "Failed to send connection ack");
            return;
        }

        let cancel = CancellationToken::new();
        let mut recv_handle = tokio::spawn(receive_loop(
            session_id,
            replies,
            sink.clone(),
            cancel.clone(),
        ));

        // Send loop: peer frames to the backend, in arrival order.
        while let Some(frame) = source.next_frame().await {
            match frame {
                Ok(frame) => {
                    if frame.name.is_empty() {
                        debug!(%session_id, "Skipping frame with empty name");
                        continue;
                    }
                    debug!(%session_id, name = %frame.name, "📨 Received message");
                    if req_tx.send(HelloRequest { name: frame.name }).await.is_err() {
                        // The backend call ended underneath us.
                        warn!(%session_id, "Backend request stream closed");
                        let _ = sink
                            .send_frame(ServerFrame::error(
                                "Failed to send message: backend stream closed",
                            ))
                            .await;
                        break;
                    }
                }
                Err(e) => {
                    warn!(%session_id, error = %e, "WebSocket read failed");
                    break;
                }
            }
        }

        // Unblock the receive task, signal end-of-input to the backend,
        // and join within the grace period. A receive task that is still
        // stuck after that is abandoned rather than leaked.
        cancel.cancel();
        drop(req_tx);

        match tokio::time::timeout(self.join_grace, &mut recv_handle).await {
            Ok(_) => debug!(%session_id, "✅ Receive task finished"),
            Err(_) => {
                warn!(%session_id, "⚠️ Timeout waiting for receive task, aborting");
                recv_handle.abort();
            }
        }
    }
}

/// Backend replies to the peer, until cancellation, backend EOF, or a
/// write failure.
async fn receive_loop(
    session_id: Uuid,
    mut replies: ReplyStream,
    sink: Arc<dyn SessionSink>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(%session_id, "Receive task cancelled");
                break;
            }
            item = replies.next() => match item {
                Some(Ok(reply)) => {
                    debug!(%session_id, message = %reply.message, "📬 Forwarding reply");
                    if let Err(e) = sink.send_frame(ServerFrame::message(reply.message)).await {
                        warn!(%session_id, error = %e, "❌ WebSocket write failed");
                        break;
                    }
                }
                Some(Err(status)) => {
                    warn!(%session_id, code = ?status.code(), message = %status.message(), "❌ gRPC receive error");
                    let _ = sink
                        .send_frame(ServerFrame::error(format!(
                            "gRPC receive error: {}",
                            status.message()
                        )))
                        .await;
                    break;
                }
                None => {
                    info!(%session_id, "gRPC stream closed by server");
                    let _ = sink.send_frame(ServerFrame::message("Stream ended")).await;
                    break;
                }
            }
        }
    }
}
