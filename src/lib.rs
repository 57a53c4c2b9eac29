//! mute-overlay: draggable overlay control for muting audio
//!
//! The core turns a raw pointer stream into one of two intents:
//! - a single or double tap toggles mute across the media, ringer, and
//!   notification channels once the quiet period passes
//! - a triple tap exits immediately
//!
//! Dragging moves the overlay surface. Everything platform-specific sits
//! behind the traits in [`overlay`] and [`audio`].

pub mod audio;
pub mod config;
pub mod controller;
pub mod events;
pub mod gesture;
pub mod ipc;
pub mod lifecycle;
pub mod overlay;
