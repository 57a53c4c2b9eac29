//! Shell-command channel driver
//!
//! Each channel maps to a pair of commands (mute / unmute) that are run
//! through `sh -c`, e.g. `pactl set-sink-mute @DEFAULT_SINK@ 1`.

use std::collections::HashMap;
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::channel::{AudioChannel, AudioChannelController, AudioError};

/// Commands that mute and unmute one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCommands {
    pub mute: String,
    pub unmute: String,
}

/// Default upper bound on a single channel command
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Drives channels by running configured shell commands
#[derive(Debug, Clone)]
pub struct CommandAudioController {
    commands: HashMap<AudioChannel, ChannelCommands>,
    timeout: Duration,
}

impl CommandAudioController {
    /// Create a controller from per-channel commands
    pub fn new(commands: HashMap<AudioChannel, ChannelCommands>) -> Self {
        Self {
            commands,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Kill commands that run longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether no channel has commands configured
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl AudioChannelController for CommandAudioController {
    fn set_muted(&self, channel: AudioChannel, muted: bool) -> Result<(), AudioError> {
        let commands = self
            .commands
            .get(&channel)
            .ok_or(AudioError::Unsupported { channel })?;
        let script = if muted { &commands.mute } else { &commands.unmute };

        debug!(%channel, muted, script, "running channel command");

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AudioError::Spawn {
                channel,
                reason: e.to_string(),
            })?;

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    warn!(%channel, timeout = ?self.timeout, "channel command timed out, killing it");
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(AudioError::TimedOut {
                        channel,
                        timeout_ms: self.timeout.as_millis() as u64,
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    return Err(AudioError::Spawn {
                        channel,
                        reason: e.to_string(),
                    });
                }
            }
        };

        if status.success() {
            return Ok(());
        }

        let mut stderr = String::new();
        if let Some(mut pipe) = child.stderr.take() {
            let _ = pipe.read_to_string(&mut stderr);
        }
        warn!(%channel, stderr = %stderr.trim(), "channel command failed");
        Err(AudioError::CommandFailed {
            channel,
            status: status.code().unwrap_or(-1),
        })
    }
}
