//! Transient wire envelopes exchanged with the browser.
//!
//! Nothing here is persisted: these types exist only to decode inbound
//! JSON (HTTP bodies, WebSocket frames) and encode outbound JSON (HTTP
//! bodies, SSE data lines, WebSocket frames).

use serde::{Deserialize, Serialize};

/// Body of `POST /api/unary`: `{"name": string}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnaryRequest {
    pub name: String,
}

/// Response body for unary and client-stream bridges: `{"message": string}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryResponse {
    pub message: String,
}

/// Query parameters for `GET /api/server-stream`
#[derive(Debug, Clone, Deserialize)]
pub struct ServerStreamParams {
    /// Defaults to "Guest" when absent
    pub name: Option<String>,
}

/// Client-to-server WebSocket frame: `{"name": string}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientFrame {
    #[serde(default)]
    pub name: String,
}

/// Server-to-client WebSocket frame
///
/// Serializes untagged so the wire shapes are `{"message": string}` and
/// `{"error": string}`, matching what the browser UI expects. The first
/// frame of every session is always `Message("Connected to server!")`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerFrame {
    Message { message: String },
    Error { error: String },
}

impl ServerFrame {
    pub fn message<S: Into<String>>(message: S) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    pub fn error<S: Into<String>>(error: S) -> Self {
        Self::Error {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_frame_wire_shapes() {
        let msg = serde_json::to_string(&ServerFrame::message("hi")).unwrap();
        assert_eq!(msg, r#"{"message":"hi"}"#);

        let err = serde_json::to_string(&ServerFrame::error("boom")).unwrap();
        assert_eq!(err, r#"{"error":"boom"}"#);
    }

    #[test]
    fn test_client_frame_tolerates_missing_name() {
        let frame: ClientFrame = serde_json::from_str("{}").unwrap();
        assert_eq!(frame.name, "");

        let frame: ClientFrame = serde_json::from_str(r#"{"name":"Alice"}"#).unwrap();
        assert_eq!(frame.name, "Alice");
    }
}
