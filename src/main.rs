//! mute-overlay-daemon: hosts the overlay core behind a Unix socket
//!
//! The overlay UI connects to the daemon and:
//! - streams raw pointer events from the floating button
//! - subscribes to position, toast, mute state, and exit notifications
//!
//! Audio channels are driven by configured shell commands, or by an
//! in-process software mixer when none are configured.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mute_overlay::audio::{
    AudioChannel, AudioChannelController, CommandAudioController, SoftwareMixer,
};
use mute_overlay::config::Config;
use mute_overlay::controller::{OverlayController, RunExit};
use mute_overlay::events::{EventSink, OverlayEvent};
use mute_overlay::ipc::Server;
use mute_overlay::lifecycle::ShutdownSignal;
use mute_overlay::overlay::OverlayPosition;

/// Time given to subscribers to receive the exit notification
const EXIT_GRACE: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "mute-overlay-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(
        ?config.socket_path,
        tap_slop = config.gesture.tap_slop,
        quiet_period_ms = config.gesture.quiet_period_ms,
        exit_tap_count = config.gesture.exit_tap_count,
        "configuration loaded"
    );

    let mut shutdown = ShutdownSignal::new()?;

    // Create channels for inter-component communication
    // IPC server -> controller
    let (pointer_tx, pointer_rx) = mpsc::channel(64);
    // Controller -> IPC server and subscribers
    let (event_tx, _event_rx) = broadcast::channel::<OverlayEvent>(64);

    let audio = audio_controller(&config);
    let position = OverlayPosition::new(config.overlay.initial_x, config.overlay.initial_y);

    let mut controller = OverlayController::new(
        &config.gesture,
        position,
        audio,
        EventSink::new(event_tx.clone()),
    );

    let server = Server::new(&config.socket_path, position, pointer_tx, event_tx.clone())?;

    // Subscribe to overlay events for the status snapshot
    let mut status_rx = event_tx.subscribe();
    let server_for_events = &server;

    info!("daemon initialized, entering main loop");

    tokio::select! {
        exit = controller.run(pointer_rx) => {
            if exit == RunExit::ExitRequested {
                info!("exit gesture received");
                tokio::time::sleep(EXIT_GRACE).await;
            }
        }

        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        _ = async {
            loop {
                match status_rx.recv().await {
                    Ok(event) => server_for_events.apply_event(&event).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "overlay event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        } => {
            info!("overlay event handler exited");
        }

        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    server.shutdown().await;

    info!("mute-overlay-daemon stopped");

    Ok(())
}

/// Pick the channel driver from configuration
fn audio_controller(config: &Config) -> Arc<dyn AudioChannelController> {
    let commands = config.audio.commands();
    if commands.is_empty() {
        info!("no audio commands configured, using software mixer");
        return Arc::new(SoftwareMixer::new());
    }

    for channel in AudioChannel::ALL {
        if !commands.contains_key(&channel) {
            warn!(%channel, "no command configured for channel, mute toggles will fail");
        }
    }

    let timeout = config.audio.command_timeout();
    Arc::new(CommandAudioController::new(commands).with_timeout(timeout))
}
