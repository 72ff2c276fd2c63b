//! Unix domain socket server for IPC
//!
//! The settings window is the host input system for capture: it forwards
//! its key-downs here and is told whether each one was consumed. Subscribed
//! clients also receive capture events as push notifications.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::chord::{
    display_shortcut, format_modifier_display, modifier_labels, to_backend_format, CapturedChord,
    ShortcutSpec,
};
use crate::events::CaptureEvent;
use crate::platform::Platform;
use crate::state::{CaptureError, CaptureHandle};

use super::protocol::{
    read_frame, write_frame, DaemonStatus, Notification, Request, Response, ShortcutDescription,
};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    state: Arc<ServerState>,
    shutdown_tx: broadcast::Sender<()>,
}

/// State shared with every client handler
struct ServerState {
    capture: CaptureHandle,
    events: broadcast::Sender<CaptureEvent>,
    platform: Platform,
    start_time: Instant,
}

/// Frames queued for a client's writer task
enum Outgoing {
    Response(Response),
    Notification(Notification),
}

impl Server {
    /// Create a new IPC server bound to `socket_path`
    pub fn new(
        socket_path: &Path,
        capture: CaptureHandle,
        events: broadcast::Sender<CaptureEvent>,
        platform: Platform,
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

        let state = Arc::new(ServerState {
            capture,
            events,
            platform,
            start_time: Instant::now(),
        });

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            state,
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let state = Arc::clone(&self.state);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, state) => {
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
    async fn handle_client(stream: UnixStream, state: Arc<ServerState>) -> Result<()> {
        let (mut reader, mut writer) = stream.into_split();
        let (out_tx, mut out_rx) = mpsc::channel::<Outgoing>(32);

        let writer_task = tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let result = match &msg {
                    Outgoing::Response(response) => write_frame(&mut writer, response).await,
                    Outgoing::Notification(note) => write_frame(&mut writer, note).await,
                };
                if let Err(e) = result {
                    debug!(?e, "client write failed");
                    break;
                }
            }
        });

        let mut forwarder: Option<JoinHandle<()>> = None;

        let outcome = loop {
            let request: Request = match read_frame(&mut reader).await {
                Ok(Some(request)) => request,
                Ok(None) => {
                    debug!("client disconnected");
                    break Ok(());
                }
                Err(e) => break Err(e.context("failed to read request")),
            };

            debug!(?request, "received request");

            let subscribe = matches!(request, Request::Subscribe);
            let response = Self::process_request(request, &state).await;

            if out_tx.send(Outgoing::Response(response)).await.is_err() {
                break Ok(());
            }

            if subscribe && forwarder.is_none() {
                forwarder = Some(Self::spawn_forwarder(state.events.subscribe(), out_tx.clone()));
                debug!("client subscribed to notifications");
            }
        };

        if let Some(forwarder) = forwarder {
            forwarder.abort();
        }
        drop(out_tx);
        let _ = writer_task.await;

        outcome
    }

    /// Push capture events to one subscribed client
    fn spawn_forwarder(
        mut events: broadcast::Receiver<CaptureEvent>,
        out_tx: mpsc::Sender<Outgoing>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let note = Notification::Event { event };
                        if out_tx.send(Outgoing::Notification(note)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Process a request and return a response
    async fn process_request(request: Request, state: &ServerState) -> Response {
        let unavailable = |e: CaptureError| Response::error("controller_unavailable", e);

        match request {
            Request::Ping => Response::Pong,

            Request::GetStatus => match state.capture.snapshot().await {
                Ok(snapshot) => Response::Status(DaemonStatus {
                    state: snapshot.state,
                    listening: snapshot.listening,
                    platform: state.platform,
                    debounce_ms: snapshot.debounce_window.as_millis() as u64,
                    captured: snapshot.result.as_ref().map(ShortcutSpec::from),
                    uptime_secs: state.start_time.elapsed().as_secs(),
                    ..DaemonStatus::default()
                }),
                Err(e) => unavailable(e),
            },

            Request::StartCapture => match state.capture.start().await {
                Ok(capture_state) => Response::CaptureState { state: capture_state },
                Err(e) => unavailable(e),
            },

            Request::CancelCapture => match state.capture.cancel().await {
                Ok(capture_state) => Response::CaptureState { state: capture_state },
                Err(e) => unavailable(e),
            },

            Request::SetEnabled { enabled } => match state.capture.set_enabled(enabled).await {
                Ok(capture_state) => Response::CaptureState { state: capture_state },
                Err(e) => unavailable(e),
            },

            Request::KeyDown { key } => match state.capture.key_down(key).await {
                Ok(disposition) => Response::Key {
                    consumed: disposition.is_consumed(),
                },
                Err(e) => unavailable(e),
            },

            Request::DescribeShortcut { modifier, key } => {
                match (ShortcutSpec { modifier, key }).to_chord() {
                    Ok(chord) => Response::Shortcut(describe(&chord, state.platform)),
                    Err(e) => Response::error("invalid_shortcut", e),
                }
            }

            Request::DefaultShortcut => {
                match ShortcutSpec::platform_default(state.platform).to_chord() {
                    Ok(chord) => Response::Shortcut(describe(&chord, state.platform)),
                    Err(e) => Response::error("invalid_shortcut", e),
                }
            }

            Request::FormatKey { identifier } => Response::Label {
                label: format_modifier_display(&identifier, state.platform.name()).into_owned(),
            },

            Request::Subscribe => Response::Subscribed,
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

/// Canonical and display forms of a chord
fn describe(chord: &CapturedChord, platform: Platform) -> ShortcutDescription {
    let spec = to_backend_format(chord);
    ShortcutDescription {
        modifier: spec.modifier,
        key: spec.key,
        display: display_shortcut(chord, platform),
        labels: modifier_labels(chord, platform)
            .into_iter()
            .map(str::to_string)
            .collect(),
    }
}

/// Callback that publishes accepted chords as capture events
pub fn capture_notifier(
    events: broadcast::Sender<CaptureEvent>,
    platform: Platform,
) -> impl FnMut(CapturedChord) + Send + 'static {
    move |chord| {
        let event = CaptureEvent::captured(to_backend_format(&chord), display_shortcut(&chord, platform));
        info!(%event, "publishing captured shortcut");
        let _ = events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::state::{channel, CaptureController, CaptureState};

    fn spawn_controller(
        platform: Platform,
    ) -> (CaptureHandle, broadcast::Sender<CaptureEvent>, JoinHandle<()>) {
        let (events_tx, _) = broadcast::channel(16);
        let (handle, commands) = channel(16);
        let mut controller = CaptureController::new(
            Duration::from_millis(150),
            capture_notifier(events_tx.clone(), platform),
        );
        let events = events_tx.clone();
        let task = tokio::spawn(async move {
            controller.run(commands, events).await;
        });
        (handle, events_tx, task)
    }

    fn test_state(platform: Platform) -> (ServerState, JoinHandle<()>) {
        let (capture, events, task) = spawn_controller(platform);
        let state = ServerState {
            capture,
            events,
            platform,
            start_time: Instant::now(),
        };
        (state, task)
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_over_requests() {
        let (state, _task) = test_state(Platform::MacOs);
        let mut events = state.events.subscribe();

        let resp = Server::process_request(Request::KeyDown { key: "Meta".into() }, &state).await;
        assert_eq!(resp, Response::Key { consumed: false });

        let resp = Server::process_request(Request::StartCapture, &state).await;
        assert_eq!(resp, Response::CaptureState { state: CaptureState::Armed });

        for key in ["Meta", "Shift", "u"] {
            let resp = Server::process_request(Request::KeyDown { key: key.into() }, &state).await;
            assert_eq!(resp, Response::Key { consumed: true });
        }

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(events.recv().await.unwrap(), CaptureEvent::CaptureArmed);
        assert_eq!(
            events.recv().await.unwrap(),
            CaptureEvent::ShortcutCaptured {
                modifier: "super+shift".into(),
                key: "u".into(),
                display: "Cmd+Shift+U".into(),
            }
        );

        match Server::process_request(Request::GetStatus, &state).await {
            Response::Status(status) => {
                assert_eq!(status.state, CaptureState::Resolved);
                assert!(!status.listening);
                assert_eq!(
                    status.captured,
                    Some(ShortcutSpec {
                        modifier: "super+shift".into(),
                        key: "u".into(),
                    })
                );
                assert_eq!(status.debounce_ms, 150);
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_describe_shortcut() {
        let (state, _task) = test_state(Platform::Windows);

        let resp = Server::process_request(
            Request::DescribeShortcut {
                modifier: "shift+super".into(),
                key: "K".into(),
            },
            &state,
        )
        .await;
        assert_eq!(
            resp,
            Response::Shortcut(ShortcutDescription {
                modifier: "super+shift".into(),
                key: "k".into(),
                display: "Win+Shift+K".into(),
                labels: vec!["Win".into(), "Shift".into()],
            })
        );

        let resp = Server::process_request(
            Request::DescribeShortcut {
                modifier: "ctrl".into(),
                key: "F1".into(),
            },
            &state,
        )
        .await;
        assert!(matches!(resp, Response::Error { ref code, .. } if code == "invalid_shortcut"));

        match Server::process_request(Request::DefaultShortcut, &state).await {
            Response::Shortcut(desc) => assert_eq!(desc.display, "Alt+R"),
            other => panic!("unexpected response: {:?}", other),
        }

        let resp = Server::process_request(
            Request::FormatKey {
                identifier: "Meta".into(),
            },
            &state,
        )
        .await;
        assert_eq!(resp, Response::Label { label: "Win".into() });
    }

    #[tokio::test]
    async fn test_socket_round_trip() {
        let socket_path = std::env::temp_dir().join(format!(
            "shortcut-capture-test-{}.sock",
            std::process::id()
        ));
        let (capture, events, _task) = spawn_controller(Platform::Linux);
        let server = Server::new(&socket_path, capture, events, Platform::Linux).unwrap();

        let client = async {
            let mut stream = UnixStream::connect(&socket_path).await.unwrap();
            write_frame(&mut stream, &Request::Ping).await.unwrap();
            let pong: Option<Response> = read_frame(&mut stream).await.unwrap();

            write_frame(&mut stream, &Request::Subscribe).await.unwrap();
            let subscribed: Option<Response> = read_frame(&mut stream).await.unwrap();

            write_frame(&mut stream, &Request::StartCapture).await.unwrap();
            // The reply and the pushed event may arrive in either order
            let first: Option<serde_json::Value> = read_frame(&mut stream).await.unwrap();
            let second: Option<serde_json::Value> = read_frame(&mut stream).await.unwrap();

            (pong, subscribed, [first.unwrap(), second.unwrap()])
        };

        let (pong, subscribed, frames) = tokio::select! {
            result = client => result,
            result = server.run() => panic!("server exited: {:?}", result),
        };

        assert_eq!(pong, Some(Response::Pong));
        assert_eq!(subscribed, Some(Response::Subscribed));

        let armed = serde_json::to_value(Response::CaptureState { state: CaptureState::Armed }).unwrap();
        let pushed = serde_json::to_value(Notification::Event {
            event: CaptureEvent::CaptureArmed,
        })
        .unwrap();
        assert!(frames.contains(&armed));
        assert!(frames.contains(&pushed));

        server.shutdown().await;
        assert!(!socket_path.exists());
    }
}
