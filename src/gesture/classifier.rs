//! Pointer gesture classification
//!
//! Turns a down/move*/up pointer sequence into drag positions or a
//! single discrete tap.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default release slop below which a pointer sequence counts as a tap
pub const DEFAULT_TAP_SLOP: f32 = 10.0;

/// Raw pointer events in device coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum PointerEvent {
    /// Pointer pressed
    Down { x: f32, y: f32 },
    /// Pointer moved while pressed
    Move { x: f32, y: f32 },
    /// Pointer released
    Up { x: f32, y: f32 },
}

/// Result of classifying a single pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// A session was opened; subsequent events belong to it
    Began,
    /// The surface should move to the given position
    Drag { x: i32, y: i32 },
    /// A completed down/up sequence within the tap slop
    Tap,
    /// The sequence ended as a drag; nothing further to do
    Released,
}

/// Malformed pointer sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GestureAnomaly {
    #[error("pointer move received without a preceding down")]
    MoveWithoutDown,

    #[error("pointer up received without a preceding down")]
    UpWithoutDown,
}

/// State captured on pointer down, valid until the matching up
#[derive(Debug, Clone, Copy, PartialEq)]
struct PointerSession {
    start_x: i32,
    start_y: i32,
    start_touch_x: f32,
    start_touch_y: f32,
}

/// Classifies pointer sequences into drags and taps
#[derive(Debug)]
pub struct GestureClassifier {
    tap_slop: f32,
    session: Option<PointerSession>,
}

impl GestureClassifier {
    /// Create a classifier with the given tap slop
    pub fn new(tap_slop: f32) -> Self {
        Self {
            tap_slop,
            session: None,
        }
    }

    /// Whether a pointer session is currently open
    pub fn in_session(&self) -> bool {
        self.session.is_some()
    }

    /// Classify one pointer event.
    ///
    /// `surface` is the overlay position at the time of the event and is
    /// only read on `Down`.
    pub fn handle(
        &mut self,
        event: PointerEvent,
        surface: (i32, i32),
    ) -> Result<Gesture, GestureAnomaly> {
        match event {
            PointerEvent::Down { x, y } => {
                if self.session.is_some() {
                    debug!("pointer down during open session, replacing it");
                }
                self.session = Some(PointerSession {
                    start_x: surface.0,
                    start_y: surface.1,
                    start_touch_x: x,
                    start_touch_y: y,
                });
                Ok(Gesture::Began)
            }
            PointerEvent::Move { x, y } => {
                let session = self.session.ok_or(GestureAnomaly::MoveWithoutDown)?;
                Ok(Gesture::Drag {
                    x: session.start_x.saturating_add((x - session.start_touch_x) as i32),
                    y: session.start_y.saturating_add((y - session.start_touch_y) as i32),
                })
            }
            PointerEvent::Up { x, y } => {
                let session = self.session.take().ok_or(GestureAnomaly::UpWithoutDown)?;
                let delta_x = (x - session.start_touch_x).abs();
                let delta_y = (y - session.start_touch_y).abs();

                if delta_x < self.tap_slop && delta_y < self.tap_slop {
                    Ok(Gesture::Tap)
                } else {
                    debug!(delta_x, delta_y, "release outside tap slop");
                    Ok(Gesture::Released)
                }
            }
        }
    }
}

impl Default for GestureClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_TAP_SLOP)
    }
}
