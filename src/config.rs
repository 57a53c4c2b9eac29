//! Configuration loading and management

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::audio::{AudioChannel, ChannelCommands, DEFAULT_COMMAND_TIMEOUT};
use crate::gesture::{DEFAULT_EXIT_TAP_COUNT, DEFAULT_QUIET_PERIOD, DEFAULT_TAP_SLOP};
use crate::overlay::DEFAULT_POSITION;

/// Environment variable that overrides the config file location
pub const CONFIG_PATH_ENV: &str = "MUTE_OVERLAY_CONFIG";

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// Directory for runtime data
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub gesture: GestureConfig,

    #[serde(default)]
    pub overlay: OverlayConfig,

    #[serde(default)]
    pub audio: AudioConfig,
}

/// Tap and drag recognition thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureConfig {
    /// Release displacement (per axis) below which a sequence is a tap
    #[serde(default = "default_tap_slop")]
    pub tap_slop: f32,

    /// Quiet period after the last tap before a burst resolves
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,

    /// Taps in one burst that resolve as an exit
    #[serde(default = "default_exit_tap_count")]
    pub exit_tap_count: u32,
}

/// Overlay placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    #[serde(default = "default_initial_x")]
    pub initial_x: i32,
    #[serde(default = "default_initial_y")]
    pub initial_y: i32,
}

/// Per-channel shell commands; with none configured the software mixer is used
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default)]
    pub media: Option<ChannelCommands>,
    #[serde(default)]
    pub ringer: Option<ChannelCommands>,
    #[serde(default)]
    pub notification: Option<ChannelCommands>,

    /// A channel command still running after this long is killed
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join("mute-overlay")
}

fn default_socket_path() -> PathBuf {
    default_data_dir().join("daemon.sock")
}

fn default_tap_slop() -> f32 {
    DEFAULT_TAP_SLOP
}

fn default_quiet_period_ms() -> u64 {
    DEFAULT_QUIET_PERIOD.as_millis() as u64
}

fn default_exit_tap_count() -> u32 {
    DEFAULT_EXIT_TAP_COUNT
}

fn default_initial_x() -> i32 {
    DEFAULT_POSITION.0
}

fn default_initial_y() -> i32 {
    DEFAULT_POSITION.1
}

fn default_command_timeout_ms() -> u64 {
    DEFAULT_COMMAND_TIMEOUT.as_millis() as u64
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            tap_slop: default_tap_slop(),
            quiet_period_ms: default_quiet_period_ms(),
            exit_tap_count: default_exit_tap_count(),
        }
    }
}

impl GestureConfig {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    /// Reject thresholds the recognizers cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(self.tap_slop > 0.0) {
            bail!("gesture.tap_slop must be positive, got {}", self.tap_slop);
        }
        if self.quiet_period_ms == 0 {
            bail!("gesture.quiet_period_ms must be positive");
        }
        if self.exit_tap_count < 2 {
            bail!(
                "gesture.exit_tap_count must be at least 2, got {}",
                self.exit_tap_count
            );
        }
        Ok(())
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            initial_x: default_initial_x(),
            initial_y: default_initial_y(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            media: None,
            ringer: None,
            notification: None,
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

impl AudioConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Channels that have commands configured
    pub fn commands(&self) -> HashMap<AudioChannel, ChannelCommands> {
        [
            (AudioChannel::Media, &self.media),
            (AudioChannel::Ringer, &self.ringer),
            (AudioChannel::Notification, &self.notification),
        ]
        .into_iter()
        .filter_map(|(channel, cmds)| cmds.clone().map(|c| (channel, c)))
        .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            data_dir: default_data_dir(),
            gesture: GestureConfig::default(),
            overlay: OverlayConfig::default(),
            audio: AudioConfig::default(),
        }
    }
}

impl Config {
    /// Default location of the config file
    pub fn config_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| default_data_dir().join("config.toml"))
    }

    /// Load configuration from the config file if present, else defaults
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.gesture.validate()?;
        if config.audio.command_timeout_ms == 0 {
            bail!("audio.command_timeout_ms must be positive");
        }
        Ok(config)
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}
