//! Events emitted by the overlay controller
//!
//! Provides the notification type pushed to subscribed clients, and a
//! broadcast-backed host that turns surface, toast, and exit calls into
//! those notifications.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::overlay::{ExitHandler, Notifier, OverlaySurface, SurfaceError};

/// Notifications produced while the overlay runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OverlayEvent {
    /// Surface should be drawn at a new position
    Moved { x: i32, y: i32 },

    /// Short user-facing message
    Toast { message: String },

    /// Mute state was committed
    MuteChanged { muted: bool },

    /// Overlay is closing
    Exiting,
}

impl std::fmt::Display for OverlayEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlayEvent::Moved { x, y } => write!(f, "MOVED ({}, {})", x, y),
            OverlayEvent::Toast { message } => write!(f, "TOAST \"{}\"", message),
            OverlayEvent::MuteChanged { muted } => write!(f, "MUTE_CHANGED ({})", muted),
            OverlayEvent::Exiting => write!(f, "EXITING"),
        }
    }
}

/// Host that publishes every interaction on a broadcast channel
#[derive(Debug, Clone)]
pub struct EventSink {
    event_tx: broadcast::Sender<OverlayEvent>,
}

impl EventSink {
    pub fn new(event_tx: broadcast::Sender<OverlayEvent>) -> Self {
        Self { event_tx }
    }

    fn emit(&self, event: OverlayEvent) {
        debug!(%event, "emitting overlay event");
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}

impl OverlaySurface for EventSink {
    fn move_to(&self, x: i32, y: i32) -> Result<(), SurfaceError> {
        self.event_tx
            .send(OverlayEvent::Moved { x, y })
            .map(|_| ())
            .map_err(|_| SurfaceError::Detached)
    }

    fn show_muted(&self, muted: bool) {
        self.emit(OverlayEvent::MuteChanged { muted });
    }
}

impl Notifier for EventSink {
    fn toast(&self, message: &str) {
        self.emit(OverlayEvent::Toast {
            message: message.to_string(),
        });
    }
}

impl ExitHandler for EventSink {
    fn exit(&self) {
        self.emit(OverlayEvent::Exiting);
    }
}
