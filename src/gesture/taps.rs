//! Multi-tap debounce state machine
//!
//! Absorbs bursts of taps and resolves each burst into exactly one action:
//! a mute toggle once the quiet period elapses, or an exit as soon as the
//! exit tap count is reached.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Default quiet period after the last tap before a burst resolves
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Default number of taps that resolve a burst as an exit
pub const DEFAULT_EXIT_TAP_COUNT: u32 = 3;

/// Actions a tap burst resolves into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TapAction {
    /// Flip the mute state
    ToggleMute,
    /// Leave the overlay
    Exit,
}

impl std::fmt::Display for TapAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TapAction::ToggleMute => write!(f, "TOGGLE_MUTE"),
            TapAction::Exit => write!(f, "EXIT"),
        }
    }
}

/// The single outstanding resolution of a burst
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingResolution {
    /// When the resolution fires if no further tap arrives
    pub deadline: Instant,
    /// Tap count captured when the resolution was armed
    pub armed_count: u32,
}

/// Debounced tap counter
#[derive(Debug)]
pub struct TapAccumulator {
    quiet_period: Duration,
    exit_tap_count: u32,
    count: u32,
    pending: Option<PendingResolution>,
}

impl TapAccumulator {
    /// Create an accumulator
    pub fn new(quiet_period: Duration, exit_tap_count: u32) -> Self {
        Self {
            quiet_period,
            exit_tap_count,
            count: 0,
            pending: None,
        }
    }

    /// Taps absorbed in the current burst
    pub fn count(&self) -> u32 {
        self.count
    }

    /// True when no burst is in progress
    pub fn is_idle(&self) -> bool {
        self.count == 0 && self.pending.is_none()
    }

    /// The outstanding resolution, if any
    pub fn pending(&self) -> Option<PendingResolution> {
        self.pending
    }

    /// Deadline of the outstanding resolution, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.deadline)
    }

    /// Absorb a tap observed at `now`.
    ///
    /// Returns `Some(TapAction::Exit)` when the burst reaches the exit tap
    /// count; otherwise arms a resolution and returns `None`.
    pub fn on_tap(&mut self, now: Instant) -> Option<TapAction> {
        // Any outstanding resolution is superseded by this tap
        self.pending = None;
        self.count += 1;

        if self.count == self.exit_tap_count {
            info!(count = self.count, "exit tap count reached");
            self.reset();
            return Some(TapAction::Exit);
        }

        if self.count > self.exit_tap_count {
            warn!(count = self.count, "tap count overflowed, clamping");
            self.reset();
            return None;
        }

        let pending = PendingResolution {
            deadline: now + self.quiet_period,
            armed_count: self.count,
        };
        debug!(count = self.count, "tap absorbed, resolution armed");
        self.pending = Some(pending);
        None
    }

    /// Fire the outstanding resolution.
    ///
    /// The armed count is re-checked against the current count; a mismatch
    /// drops the resolution without acting.
    pub fn on_deadline(&mut self) -> Option<TapAction> {
        let pending = self.pending.take()?;

        if pending.armed_count != self.count {
            warn!(
                armed = pending.armed_count,
                current = self.count,
                "stale tap resolution dropped"
            );
            return None;
        }

        info!(taps = self.count, "tap burst resolved");
        self.reset();
        Some(TapAction::ToggleMute)
    }

    /// Fire the outstanding resolution if its deadline is at or before `now`
    pub fn poll(&mut self, now: Instant) -> Option<TapAction> {
        match self.pending {
            Some(pending) if pending.deadline <= now => self.on_deadline(),
            _ => None,
        }
    }

    /// Drop any burst in progress
    pub fn reset(&mut self) {
        self.count = 0;
        self.pending = None;
    }
}

impl Default for TapAccumulator {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD, DEFAULT_EXIT_TAP_COUNT)
    }
}
