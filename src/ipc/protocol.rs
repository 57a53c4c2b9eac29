//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.
//! Subscribed clients additionally receive [`OverlayEvent`] messages pushed on
//! the same connection.

use serde::{Deserialize, Serialize};

use crate::gesture::PointerEvent;
use crate::overlay::OverlayPosition;

/// Largest accepted message body
pub const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

/// Requests from the UI to the daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current overlay status
    GetStatus,

    /// Ping to check connectivity
    Ping,

    /// Subscribe to overlay event notifications
    Subscribe,

    /// Forward one raw pointer event from the overlay view
    Pointer(PointerEvent),
}

/// Responses from the daemon to the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current overlay status
    Status(OverlayStatus),

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Pointer event queued for the controller
    Accepted,

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Overlay status snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayStatus {
    /// Daemon version
    pub version: String,

    /// Last committed mute state
    pub muted: bool,

    /// Last known surface position
    pub position: OverlayPosition,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl OverlayStatus {
    pub fn new(position: OverlayPosition) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            muted: false,
            position,
            uptime_secs: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_request_round_trip() {
        let json = r#"{"type":"pointer","phase":"down","x":120.5,"y":80}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        assert_eq!(req, Request::Pointer(PointerEvent::Down { x: 120.5, y: 80.0 }));

        let back = serde_json::to_string(&req).unwrap();
        assert!(back.contains(r#""type":"pointer""#));
        assert!(back.contains(r#""phase":"down""#));
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Status(OverlayStatus::new(OverlayPosition::default()));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""type":"status""#));
        assert!(json.contains(r#""muted":false"#));

        let err = serde_json::to_string(&Response::error("invalid_request", "bad")).unwrap();
        assert!(err.contains("invalid_request"));
    }
}
