//! Position of the draggable overlay surface

use serde::{Deserialize, Serialize};

/// Default top-left position of a freshly created overlay
pub const DEFAULT_POSITION: (i32, i32) = (100, 100);

/// Current (x, y) of the overlay surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayPosition {
    pub x: i32,
    pub y: i32,
}

impl OverlayPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Overwrite the position
    pub fn update(&mut self, x: i32, y: i32) {
        self.x = x;
        self.y = y;
    }

    pub fn current(&self) -> (i32, i32) {
        (self.x, self.y)
    }
}

impl Default for OverlayPosition {
    fn default() -> Self {
        Self::new(DEFAULT_POSITION.0, DEFAULT_POSITION.1)
    }
}
