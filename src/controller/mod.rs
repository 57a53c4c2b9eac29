//! Controller module wiring gestures to mute and exit intents
//!
//! Runs the overlay's single event loop:
//! - pointer events are classified into drags and taps
//! - drags move the overlay surface
//! - tap bursts resolve into a mute toggle or an exit

mod machine;

pub use machine::{
    OverlayController, RunExit, EXIT_MESSAGE, MUTED_MESSAGE, TOGGLE_BUSY_MESSAGE,
    TOGGLE_FAILED_MESSAGE, UNMUTED_MESSAGE,
};
