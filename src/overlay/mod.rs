//! Overlay surface state and the host interfaces it reports to

mod host;
mod position;

pub use host::{ExitHandler, Notifier, OverlaySurface, SurfaceError};
pub use position::{OverlayPosition, DEFAULT_POSITION};
