//! Overlay event loop
//!
//! Owns the classifier, the tap accumulator, the overlay position, and the
//! mute toggle, and processes pointer events, burst deadlines, and mute
//! outcomes one at a time on a single task.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::audio::{AudioChannelController, MuteOutcome, MuteToggle};
use crate::config::GestureConfig;
use crate::gesture::{Gesture, GestureClassifier, PointerEvent, TapAccumulator, TapAction};
use crate::overlay::{ExitHandler, Notifier, OverlayPosition, OverlaySurface};

pub const MUTED_MESSAGE: &str = "Volume muted";
pub const UNMUTED_MESSAGE: &str = "Volume unmuted";
pub const TOGGLE_FAILED_MESSAGE: &str = "Failed to toggle mute";
pub const TOGGLE_BUSY_MESSAGE: &str = "Mute change already in progress";
pub const EXIT_MESSAGE: &str = "Closing overlay";

/// Why the event loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// A tap burst resolved as an exit
    ExitRequested,
    /// The pointer stream was closed by the host
    InputClosed,
}

/// Single-threaded controller tying gestures to mute and exit intents
pub struct OverlayController<H> {
    classifier: GestureClassifier,
    taps: TapAccumulator,
    position: OverlayPosition,
    mute: MuteToggle,
    host: H,
    outcome_tx: mpsc::UnboundedSender<MuteOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<MuteOutcome>,
}

impl<H> OverlayController<H>
where
    H: OverlaySurface + Notifier + ExitHandler,
{
    /// Create a controller
    pub fn new(
        gesture: &GestureConfig,
        position: OverlayPosition,
        audio: Arc<dyn AudioChannelController>,
        host: H,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            classifier: GestureClassifier::new(gesture.tap_slop),
            taps: TapAccumulator::new(gesture.quiet_period(), gesture.exit_tap_count),
            position,
            mute: MuteToggle::new(audio),
            host,
            outcome_tx,
            outcome_rx,
        }
    }

    pub fn position(&self) -> OverlayPosition {
        self.position
    }

    pub fn is_muted(&self) -> bool {
        self.mute.is_muted()
    }

    /// Taps absorbed in the burst currently in progress
    pub fn tap_count(&self) -> u32 {
        self.taps.count()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Run until the burst resolves as an exit or the pointer stream closes
    pub async fn run(&mut self, mut pointer_rx: mpsc::Receiver<PointerEvent>) -> RunExit {
        info!(position = ?self.position.current(), "overlay controller started");

        let exit = loop {
            let deadline = self.taps.deadline();

            let action = tokio::select! {
                biased;

                Some(outcome) = self.outcome_rx.recv() => {
                    self.handle_outcome(outcome);
                    None
                }

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.taps.on_deadline()
                }

                event = pointer_rx.recv() => match event {
                    Some(event) => self.handle_pointer(event, Instant::now()),
                    None => break RunExit::InputClosed,
                },
            };

            if let Some(action) = action {
                if self.dispatch(action) == Some(RunExit::ExitRequested) {
                    break RunExit::ExitRequested;
                }
            }
        };

        info!(?exit, "overlay controller stopped");
        exit
    }

    /// Process one pointer event observed at `now`.
    ///
    /// Returns an action only when a tap completes a burst immediately.
    pub fn handle_pointer(&mut self, event: PointerEvent, now: Instant) -> Option<TapAction> {
        let gesture = match self.classifier.handle(event, self.position.current()) {
            Ok(gesture) => gesture,
            Err(anomaly) => {
                warn!(%anomaly, "ignoring malformed pointer sequence");
                return None;
            }
        };

        match gesture {
            Gesture::Began | Gesture::Released => None,
            Gesture::Drag { x, y } => {
                self.position.update(x, y);
                if let Err(e) = self.host.move_to(x, y) {
                    warn!(?e, x, y, "overlay surface update failed");
                }
                None
            }
            Gesture::Tap => {
                debug!("tap recognized");
                self.taps.on_tap(now)
            }
        }
    }

    /// Act on a resolved tap burst
    fn dispatch(&mut self, action: TapAction) -> Option<RunExit> {
        info!(%action, "tap action resolved");

        match action {
            TapAction::ToggleMute => {
                self.start_toggle();
                None
            }
            TapAction::Exit => {
                self.host.toast(EXIT_MESSAGE);
                self.host.exit();
                Some(RunExit::ExitRequested)
            }
        }
    }

    /// Hand the channel work to the blocking pool; the outcome comes back
    /// through the outcome channel
    fn start_toggle(&mut self) {
        let Some(job) = self.mute.begin_toggle() else {
            warn!("mute toggle already in flight, dropping request");
            self.host.toast(TOGGLE_BUSY_MESSAGE);
            return;
        };

        debug!(target_muted = job.target(), "applying mute state");
        let outcome_tx = self.outcome_tx.clone();
        tokio::task::spawn_blocking(move || {
            let _ = outcome_tx.send(job.run());
        });
    }

    fn handle_outcome(&mut self, outcome: MuteOutcome) {
        match self.mute.finish(outcome) {
            Ok(muted) => {
                self.host.show_muted(muted);
                self.host
                    .toast(if muted { MUTED_MESSAGE } else { UNMUTED_MESSAGE });
            }
            Err(failure) => {
                warn!(%failure, rolled_back = failure.rolled_back(), "mute toggle failed");
                self.host.toast(TOGGLE_FAILED_MESSAGE);
            }
        }
    }
}
