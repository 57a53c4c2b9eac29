//! Audio module for the tri-channel mute state
//!
//! Provides the channel driver interface, a shell-command driver, and the
//! mute toggle that applies one state across all channels.

mod channel;
mod command;
mod toggle;

pub use channel::{AudioChannel, AudioChannelController, AudioError, SoftwareMixer};
pub use command::{ChannelCommands, CommandAudioController, DEFAULT_COMMAND_TIMEOUT};
pub use toggle::{apply_channels, MuteJob, MuteOutcome, MuteToggle, ToggleFailure};
