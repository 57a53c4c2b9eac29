//! Audio channels and the driver interface for muting them

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Independently mutable audio targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioChannel {
    /// Media / music playback
    Media,
    /// Incoming call ringer
    Ringer,
    /// Notification sounds
    Notification,
}

impl AudioChannel {
    /// All channels, in the order they are applied
    pub const ALL: [AudioChannel; 3] = [
        AudioChannel::Media,
        AudioChannel::Ringer,
        AudioChannel::Notification,
    ];
}

impl std::fmt::Display for AudioChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioChannel::Media => write!(f, "media"),
            AudioChannel::Ringer => write!(f, "ringer"),
            AudioChannel::Notification => write!(f, "notification"),
        }
    }
}

/// Errors raised by a channel driver
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AudioError {
    #[error("{channel} channel is not supported by this controller")]
    Unsupported { channel: AudioChannel },

    #[error("failed to run command for {channel} channel: {reason}")]
    Spawn { channel: AudioChannel, reason: String },

    #[error("command for {channel} channel exited with status {status}")]
    CommandFailed { channel: AudioChannel, status: i32 },

    #[error("command for {channel} channel did not finish within {timeout_ms}ms")]
    TimedOut { channel: AudioChannel, timeout_ms: u64 },
}

/// Driver for per-channel mute state.
///
/// Implementations must be idempotent: muting an already muted channel
/// succeeds without further effect. Calls may block.
pub trait AudioChannelController: Send + Sync {
    /// Set the mute state of one channel
    fn set_muted(&self, channel: AudioChannel, muted: bool) -> Result<(), AudioError>;
}

/// In-process mixer that only records channel state
#[derive(Debug, Default)]
pub struct SoftwareMixer {
    channels: Mutex<HashMap<AudioChannel, bool>>,
}

impl SoftwareMixer {
    /// Create a mixer with every channel unmuted
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mute state of a channel
    pub fn is_muted(&self, channel: AudioChannel) -> bool {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels.get(&channel).copied().unwrap_or(false)
    }
}

impl AudioChannelController for SoftwareMixer {
    fn set_muted(&self, channel: AudioChannel, muted: bool) -> Result<(), AudioError> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let previous = channels.insert(channel, muted).unwrap_or(false);
        if previous != muted {
            debug!(%channel, muted, "software mixer channel changed");
        }
        Ok(())
    }
}
