//! Unix domain socket server for IPC
//!
//! Accepts pointer events from the overlay UI, answers status queries, and
//! pushes overlay events to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::events::OverlayEvent;
use crate::gesture::PointerEvent;
use crate::overlay::OverlayPosition;

use super::protocol::{OverlayStatus, Request, Response, MAX_MESSAGE_BYTES};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    shared: Shared,
    shutdown_tx: broadcast::Sender<()>,
}

/// Handles shared with every client connection
#[derive(Clone)]
struct Shared {
    state: Arc<RwLock<ServerState>>,
    pointer_tx: mpsc::Sender<PointerEvent>,
    event_tx: broadcast::Sender<OverlayEvent>,
}

/// Status snapshot maintained from overlay events
struct ServerState {
    status: OverlayStatus,
    start_time: std::time::Instant,
}

impl Shared {
    /// Status with uptime filled in as of now
    async fn snapshot(&self) -> OverlayStatus {
        let state = self.state.read().await;
        let mut status = state.status.clone();
        status.uptime_secs = state.start_time.elapsed().as_secs();
        status
    }
}

impl Server {
    /// Bind the socket and create a server feeding `pointer_tx`
    pub fn new(
        socket_path: &Path,
        position: OverlayPosition,
        pointer_tx: mpsc::Sender<PointerEvent>,
        event_tx: broadcast::Sender<OverlayEvent>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        let state = Arc::new(RwLock::new(ServerState {
            status: OverlayStatus::new(position),
            start_time: std::time::Instant::now(),
        }));

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            shared: Shared {
                state,
                pointer_tx,
                event_tx,
            },
            shutdown_tx,
        })
    }

    /// Fold an overlay event into the status snapshot
    pub async fn apply_event(&self, event: &OverlayEvent) {
        let mut state = self.shared.state.write().await;
        match *event {
            OverlayEvent::Moved { x, y } => state.status.position.update(x, y),
            OverlayEvent::MuteChanged { muted } => {
                if state.status.muted != muted {
                    info!(muted, "IPC server: mute state updated");
                }
                state.status.muted = muted;
            }
            OverlayEvent::Toast { .. } | OverlayEvent::Exiting => {}
        }
    }

    /// Current status snapshot
    pub async fn status(&self) -> OverlayStatus {
        self.shared.snapshot().await
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let shared = self.shared.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, shared) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(stream: UnixStream, shared: Shared) -> Result<()> {
        let (mut reader, mut writer) = stream.into_split();

        // Frames are read on their own task so that waiting for pushed events
        // never interrupts a partially read message
        let (frame_tx, mut frame_rx) = mpsc::channel::<Vec<u8>>(16);
        let reader_task = tokio::spawn(async move {
            loop {
                match read_message(&mut reader).await {
                    Ok(Some(frame)) => {
                        if frame_tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(?e, "failed to read client message");
                        break;
                    }
                }
            }
        });

        let mut events: Option<broadcast::Receiver<OverlayEvent>> = None;

        let result = loop {
            tokio::select! {
                frame = frame_rx.recv() => {
                    let Some(frame) = frame else {
                        debug!("client disconnected");
                        break Ok(());
                    };

                    let response = match serde_json::from_slice::<Request>(&frame) {
                        Ok(request) => {
                            debug!(?request, "received request");
                            let (response, subscribe) = Self::process_request(request, &shared).await;
                            if subscribe && events.is_none() {
                                events = Some(shared.event_tx.subscribe());
                                debug!("client subscribed to notifications");
                            }
                            response
                        }
                        Err(e) => {
                            warn!(%e, "failed to parse request");
                            Response::error("invalid_request", e.to_string())
                        }
                    };

                    if let Err(e) = send_message(&mut writer, &response).await {
                        break Err(e);
                    }
                }

                event = next_event(&mut events) => match event {
                    Ok(event) => {
                        if let Err(e) = send_message(&mut writer, &event).await {
                            break Err(e);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "subscriber lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        events = None;
                    }
                },
            }
        };

        reader_task.abort();
        result
    }

    /// Process a request and return a response
    /// Returns (Response, should_subscribe)
    async fn process_request(request: Request, shared: &Shared) -> (Response, bool) {
        match request {
            Request::Ping => (Response::Pong, false),

            Request::GetStatus => (Response::Status(shared.snapshot().await), false),

            Request::Subscribe => (Response::Subscribed, true),

            Request::Pointer(event) => match shared.pointer_tx.send(event).await {
                Ok(()) => (Response::Accepted, false),
                Err(_) => (
                    Response::error("controller_unavailable", "overlay controller has stopped"),
                    false,
                ),
            },
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Wait for the next pushed event, or forever when not subscribed
async fn next_event(
    events: &mut Option<broadcast::Receiver<OverlayEvent>>,
) -> Result<OverlayEvent, broadcast::error::RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Read one length-prefixed message; `None` on clean disconnect
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_BYTES {
        bail!("message of {} bytes exceeds limit", len);
    }

    let mut msg_buf = vec![0u8; len];
    reader.read_exact(&mut msg_buf).await?;
    Ok(Some(msg_buf))
}

/// Send a length-prefixed JSON message
pub async fn send_message<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        _dir: tempfile::TempDir,
        server: Arc<Server>,
        pointer_rx: mpsc::Receiver<PointerEvent>,
        event_tx: broadcast::Sender<OverlayEvent>,
        socket_path: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("overlay.sock");
        let (pointer_tx, pointer_rx) = mpsc::channel(8);
        let (event_tx, _) = broadcast::channel(8);
        let server = Server::new(
            &socket_path,
            OverlayPosition::default(),
            pointer_tx,
            event_tx.clone(),
        )
        .unwrap();
        Fixture {
            _dir: dir,
            server: Arc::new(server),
            pointer_rx,
            event_tx,
            socket_path,
        }
    }

    async fn request(stream: &mut UnixStream, req: &Request) -> serde_json::Value {
        send_message(stream, req).await.unwrap();
        let frame = read_message(stream).await.unwrap().unwrap();
        serde_json::from_slice(&frame).unwrap()
    }

    #[tokio::test]
    async fn test_ping_and_pointer_forwarding() {
        let mut fx = fixture();
        let server = Arc::clone(&fx.server);
        tokio::spawn(async move { server.run().await });

        let mut stream = UnixStream::connect(&fx.socket_path).await.unwrap();
        assert_eq!(request(&mut stream, &Request::Ping).await["type"], "pong");

        let down = PointerEvent::Down { x: 3.0, y: 4.0 };
        let resp = request(&mut stream, &Request::Pointer(down)).await;
        assert_eq!(resp["type"], "accepted");
        assert_eq!(fx.pointer_rx.recv().await, Some(down));
    }

    #[tokio::test]
    async fn test_invalid_request_keeps_connection() {
        let fx = fixture();
        let server = Arc::clone(&fx.server);
        tokio::spawn(async move { server.run().await });

        let mut stream = UnixStream::connect(&fx.socket_path).await.unwrap();
        send_message(&mut stream, &serde_json::json!({"type": "launch"}))
            .await
            .unwrap();
        let frame = read_message(&mut stream).await.unwrap().unwrap();
        let resp: Response = serde_json::from_slice(&frame).unwrap();
        assert!(matches!(resp, Response::Error { ref code, .. } if code == "invalid_request"));

        assert_eq!(request(&mut stream, &Request::Ping).await["type"], "pong");
    }

    #[tokio::test]
    async fn test_subscriber_receives_pushed_events() {
        let fx = fixture();
        let server = Arc::clone(&fx.server);
        tokio::spawn(async move { server.run().await });

        let mut stream = UnixStream::connect(&fx.socket_path).await.unwrap();
        assert_eq!(
            request(&mut stream, &Request::Subscribe).await["type"],
            "subscribed"
        );

        fx.event_tx
            .send(OverlayEvent::MuteChanged { muted: true })
            .unwrap();
        let frame = read_message(&mut stream).await.unwrap().unwrap();
        let event: OverlayEvent = serde_json::from_slice(&frame).unwrap();
        assert_eq!(event, OverlayEvent::MuteChanged { muted: true });
    }

    #[tokio::test]
    async fn test_status_tracks_events() {
        let fx = fixture();
        fx.server
            .apply_event(&OverlayEvent::Moved { x: 40, y: 60 })
            .await;
        fx.server
            .apply_event(&OverlayEvent::MuteChanged { muted: true })
            .await;

        let status = fx.server.status().await;
        assert!(status.muted);
        assert_eq!(status.position.current(), (40, 60));

        fx.server.shutdown().await;
        assert!(!fx.socket_path.exists());
    }

    #[tokio::test]
    async fn test_get_status_matches_local_snapshot() {
        let fx = fixture();
        let server = Arc::clone(&fx.server);
        tokio::spawn(async move { server.run().await });

        fx.server
            .apply_event(&OverlayEvent::Moved { x: -5, y: 12 })
            .await;
        fx.server
            .apply_event(&OverlayEvent::MuteChanged { muted: true })
            .await;

        let mut stream = UnixStream::connect(&fx.socket_path).await.unwrap();
        send_message(&mut stream, &Request::GetStatus).await.unwrap();
        let frame = read_message(&mut stream).await.unwrap().unwrap();
        let Response::Status(remote) = serde_json::from_slice(&frame).unwrap() else {
            panic!("expected a status response");
        };

        let local = fx.server.status().await;
        assert_eq!(remote.muted, local.muted);
        assert_eq!(remote.position.current(), (-5, 12));
        assert_eq!(remote.position.current(), local.position.current());
    }

    #[tokio::test]
    async fn test_oversized_message_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let len = (MAX_MESSAGE_BYTES as u32 + 1).to_le_bytes();
        client.write_all(&len).await.unwrap();
        assert!(read_message(&mut server).await.is_err());
    }
}
