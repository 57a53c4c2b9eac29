//! Interfaces the host provides to the overlay core

/// Errors raised when the host cannot reposition the surface
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    #[error("overlay surface rejected move to ({x}, {y}): {reason}")]
    Rejected { x: i32, y: i32, reason: String },

    #[error("overlay surface is not attached")]
    Detached,
}

/// The rendered surface that follows drags
pub trait OverlaySurface {
    /// Move the surface to the given position
    fn move_to(&self, x: i32, y: i32) -> Result<(), SurfaceError>;

    /// Reflect a committed mute state in the surface's appearance
    fn show_muted(&self, _muted: bool) {}
}

/// Best-effort user feedback, must not block
pub trait Notifier {
    fn toast(&self, message: &str);
}

/// Receives the exit intent; owns teardown
pub trait ExitHandler {
    fn exit(&self);
}
