//! Gesture module for pointer input
//!
//! Classifies raw pointer sequences into drags and taps, and debounces
//! tap bursts into resolved actions.

mod classifier;
mod taps;

pub use classifier::{
    Gesture, GestureAnomaly, GestureClassifier, PointerEvent, DEFAULT_TAP_SLOP,
};
pub use taps::{
    PendingResolution, TapAccumulator, TapAction, DEFAULT_EXIT_TAP_COUNT, DEFAULT_QUIET_PERIOD,
};
