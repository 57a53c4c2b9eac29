//! Tri-channel mute toggle
//!
//! Applies one mute state to every channel as a unit. A failure on any
//! channel rolls back the channels already switched and leaves the flag
//! untouched, so the next attempt starts from a known state.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::channel::{AudioChannel, AudioChannelController, AudioError};

/// A mute state change that did not take effect
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to {} audio: {}", action_verb(.target), .error)]
pub struct ToggleFailure {
    /// The state that was requested
    pub target: bool,
    /// First channel failure, which aborted the apply
    pub error: AudioError,
    /// Channels that could not be restored afterwards
    pub rollback_errors: Vec<AudioError>,
}

fn action_verb(target: &bool) -> &'static str {
    if *target {
        "mute"
    } else {
        "unmute"
    }
}

impl ToggleFailure {
    /// True if every switched channel was restored
    pub fn rolled_back(&self) -> bool {
        self.rollback_errors.is_empty()
    }
}

/// Drive every channel to `target`, restoring switched channels on failure
pub fn apply_channels(
    controller: &dyn AudioChannelController,
    target: bool,
) -> Result<(), ToggleFailure> {
    let mut applied: Vec<AudioChannel> = Vec::with_capacity(AudioChannel::ALL.len());

    for channel in AudioChannel::ALL {
        match controller.set_muted(channel, target) {
            Ok(()) => applied.push(channel),
            Err(error) => {
                warn!(%channel, ?error, target, "channel update failed, rolling back");
                let rollback_errors = applied
                    .iter()
                    .rev()
                    .filter_map(|&ch| controller.set_muted(ch, !target).err())
                    .collect::<Vec<_>>();
                return Err(ToggleFailure {
                    target,
                    error,
                    rollback_errors,
                });
            }
        }
    }

    Ok(())
}

/// A channel apply detached from the toggle, for running off the event loop
pub struct MuteJob {
    controller: Arc<dyn AudioChannelController>,
    target: bool,
}

impl MuteJob {
    /// Requested state
    pub fn target(&self) -> bool {
        self.target
    }

    /// Perform the channel updates (may block)
    pub fn run(self) -> MuteOutcome {
        MuteOutcome {
            target: self.target,
            result: apply_channels(self.controller.as_ref(), self.target),
        }
    }
}

/// Result of a finished [`MuteJob`]
#[derive(Debug, Clone)]
pub struct MuteOutcome {
    pub target: bool,
    pub result: Result<(), ToggleFailure>,
}

/// Owner of the mute flag
pub struct MuteToggle {
    controller: Arc<dyn AudioChannelController>,
    is_muted: bool,
    in_flight: bool,
}

impl MuteToggle {
    /// Create a toggle starting unmuted
    pub fn new(controller: Arc<dyn AudioChannelController>) -> Self {
        Self {
            controller,
            is_muted: false,
            in_flight: false,
        }
    }

    /// Last successfully applied state
    pub fn is_muted(&self) -> bool {
        self.is_muted
    }

    /// Whether a detached apply has not reported back yet
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Apply `target` to all channels and commit the flag on success
    pub fn apply(&mut self, target: bool) -> Result<(), ToggleFailure> {
        apply_channels(self.controller.as_ref(), target)?;
        self.commit(target);
        Ok(())
    }

    /// Flip the current state, returning the new one
    pub fn toggle(&mut self) -> Result<bool, ToggleFailure> {
        let target = !self.is_muted;
        self.apply(target)?;
        Ok(target)
    }

    /// Start a detached toggle.
    ///
    /// Returns `None` while a previous job is still outstanding.
    pub fn begin_toggle(&mut self) -> Option<MuteJob> {
        if self.in_flight {
            return None;
        }
        self.in_flight = true;
        Some(MuteJob {
            controller: Arc::clone(&self.controller),
            target: !self.is_muted,
        })
    }

    /// Record the outcome of a detached job
    pub fn finish(&mut self, outcome: MuteOutcome) -> Result<bool, ToggleFailure> {
        self.in_flight = false;
        outcome.result?;
        self.commit(outcome.target);
        Ok(outcome.target)
    }

    fn commit(&mut self, target: bool) {
        if self.is_muted == target {
            debug!(muted = target, "mute state reasserted");
        } else {
            info!(muted = target, "mute state changed");
        }
        self.is_muted = target;
    }
}

impl std::fmt::Debug for MuteToggle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MuteToggle")
            .field("is_muted", &self.is_muted)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::audio::SoftwareMixer;

    /// Records calls and fails a chosen channel
    #[derive(Default)]
    struct FlakyController {
        fail_on: Mutex<Option<AudioChannel>>,
        calls: Mutex<Vec<(AudioChannel, bool)>>,
    }

    impl FlakyController {
        fn failing(channel: AudioChannel) -> Self {
            Self {
                fail_on: Mutex::new(Some(channel)),
                ..Default::default()
            }
        }

        fn heal(&self) {
            *self.fail_on.lock().unwrap() = None;
        }

        fn calls(&self) -> Vec<(AudioChannel, bool)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl AudioChannelController for FlakyController {
        fn set_muted(&self, channel: AudioChannel, muted: bool) -> Result<(), AudioError> {
            self.calls.lock().unwrap().push((channel, muted));
            if *self.fail_on.lock().unwrap() == Some(channel) {
                return Err(AudioError::Unsupported { channel });
            }
            Ok(())
        }
    }

    #[test]
    fn test_toggle_mutes_every_channel() {
        let mixer = Arc::new(SoftwareMixer::new());
        let mut toggle = MuteToggle::new(mixer.clone());

        assert!(assert_ok!(toggle.toggle()));
        assert!(toggle.is_muted());
        for channel in AudioChannel::ALL {
            assert!(mixer.is_muted(channel));
        }

        assert!(!assert_ok!(toggle.toggle()));
        for channel in AudioChannel::ALL {
            assert!(!mixer.is_muted(channel));
        }
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mixer = Arc::new(SoftwareMixer::new());
        let mut toggle = MuteToggle::new(mixer.clone());

        assert_ok!(toggle.apply(true));
        assert_ok!(toggle.apply(true));
        assert!(toggle.is_muted());
        assert!(mixer.is_muted(AudioChannel::Notification));
    }

    #[test]
    fn test_failure_rolls_back_and_keeps_flag() {
        let ctrl = Arc::new(FlakyController::failing(AudioChannel::Notification));
        let mut toggle = MuteToggle::new(ctrl.clone());

        let failure = assert_err!(toggle.apply(true));
        assert!(!toggle.is_muted());
        assert!(failure.rolled_back());
        assert_eq!(
            failure.error,
            AudioError::Unsupported {
                channel: AudioChannel::Notification
            }
        );
        assert_eq!(
            ctrl.calls(),
            vec![
                (AudioChannel::Media, true),
                (AudioChannel::Ringer, true),
                (AudioChannel::Notification, true),
                (AudioChannel::Ringer, false),
                (AudioChannel::Media, false),
            ]
        );
        assert_eq!(
            failure.to_string(),
            "failed to mute audio: notification channel is not supported by this controller"
        );
    }

    #[test]
    fn test_retry_after_failure_starts_from_known_state() {
        let ctrl = Arc::new(FlakyController::failing(AudioChannel::Media));
        let mut toggle = MuteToggle::new(ctrl.clone());

        assert_err!(toggle.toggle());
        ctrl.heal();
        assert!(assert_ok!(toggle.toggle()));
    }

    #[test]
    fn test_unrecoverable_rollback_is_reported() {
        // Ringer fails in both directions, media cannot be restored either
        struct Broken;
        impl AudioChannelController for Broken {
            fn set_muted(&self, channel: AudioChannel, muted: bool) -> Result<(), AudioError> {
                match (channel, muted) {
                    (AudioChannel::Media, true) => Ok(()),
                    _ => Err(AudioError::CommandFailed { channel, status: 1 }),
                }
            }
        }

        let failure = assert_err!(apply_channels(&Broken, true));
        assert!(!failure.rolled_back());
        assert_eq!(
            failure.rollback_errors,
            vec![AudioError::CommandFailed {
                channel: AudioChannel::Media,
                status: 1
            }]
        );
    }

    #[test]
    fn test_detached_job_commits_on_finish() {
        let mut toggle = MuteToggle::new(Arc::new(SoftwareMixer::new()));

        let job = toggle.begin_toggle().unwrap();
        assert!(job.target());
        assert!(toggle.in_flight());
        assert!(toggle.begin_toggle().is_none());

        // Flag is only committed once the outcome is delivered
        let outcome = job.run();
        assert!(!toggle.is_muted());
        assert!(assert_ok!(toggle.finish(outcome)));
        assert!(toggle.is_muted());
        assert!(!toggle.in_flight());
    }

    #[test]
    fn test_detached_failure_leaves_flag() {
        let ctrl = Arc::new(FlakyController::failing(AudioChannel::Ringer));
        let mut toggle = MuteToggle::new(ctrl);

        let outcome = toggle.begin_toggle().unwrap().run();
        assert_err!(toggle.finish(outcome));
        assert!(!toggle.is_muted());
        assert!(!toggle.in_flight());
    }
}
