//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use anyhow::{bail, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::chord::ShortcutSpec;
use crate::events::CaptureEvent;
use crate::platform::Platform;
use crate::state::CaptureState;

/// Largest frame accepted in either direction
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Requests from the settings UI to the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request current daemon status
    GetStatus,

    /// Begin a capture session
    StartCapture,

    /// Abandon the capture session
    CancelCapture,

    /// Arm or disarm capture
    SetEnabled { enabled: bool },

    /// A key-down observed by the settings window
    KeyDown { key: String },

    /// Validate a stored shortcut and render its labels
    DescribeShortcut { modifier: String, key: String },

    /// The platform's default shortcut
    DefaultShortcut,

    /// Label for a single raw key identifier, e.g. "Meta" -> "Cmd"
    FormatKey { identifier: String },

    /// Subscribe to capture event notifications
    Subscribe,
}

/// Responses from daemon to UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    /// Current daemon status
    Status(DaemonStatus),

    /// Controller state after a start/cancel/enable request
    CaptureState { state: CaptureState },

    /// Whether the key was consumed by an active capture
    Key { consumed: bool },

    /// A shortcut in canonical and display form
    Shortcut(ShortcutDescription),

    /// Display label for one key
    Label { label: String },

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

/// Push notification from daemon to UI (for subscribed clients)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Capture session event
    Event { event: CaptureEvent },
}

/// A shortcut as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutDescription {
    /// Canonical modifier string
    pub modifier: String,
    /// Lowercase trigger letter
    pub key: String,
    /// Full label, e.g. "Cmd+Shift+U"
    pub display: String,
    /// One label per modifier, in canonical order
    pub labels: Vec<String>,
}

/// Full daemon status snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Capture controller state
    pub state: CaptureState,

    /// Whether key-downs are being consumed
    pub listening: bool,

    /// Platform used for labels
    pub platform: Platform,

    /// Debounce window in milliseconds
    pub debounce_ms: u64,

    /// Last accepted shortcut of the current session
    pub captured: Option<ShortcutSpec>,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for DaemonStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: CaptureState::default(),
            listening: false,
            platform: Platform::current(),
            debounce_ms: 0,
            captured: None,
            uptime_secs: 0,
        }
    }
}

impl Response {
    pub fn error(code: &str, message: impl std::fmt::Display) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

/// Read one length-prefixed JSON frame.
///
/// Returns `Ok(None)` on a clean EOF before the length prefix.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        bail!("frame of {len} bytes exceeds limit");
    }

    let mut msg_buf = vec![0u8; len];
    reader.read_exact(&mut msg_buf).await?;
    Ok(Some(serde_json::from_slice(&msg_buf)?))
}

/// Write one length-prefixed JSON frame
pub async fn write_frame<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let msg_bytes = serde_json::to_vec(msg)?;
    if msg_bytes.len() > MAX_FRAME_LEN {
        bail!("frame of {} bytes exceeds limit", msg_bytes.len());
    }
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;
    writer.flush().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[test]
    fn test_request_serialization() {
        let req = Request::KeyDown { key: "Control".to_string() };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"type":"key_down","key":"Control"}"#);

        let req: Request = serde_json::from_str(r#"{"type":"start_capture"}"#).unwrap();
        assert_eq!(req, Request::StartCapture);
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Status(DaemonStatus::default());
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"type\":\"status\""));

        let resp = Response::CaptureState { state: CaptureState::Armed };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"type":"capture_state","state":"armed"}"#);
    }

    #[tokio::test]
    async fn test_frames_over_duplex() {
        let (mut client, mut server) = tokio::io::duplex(256);

        assert_ok!(write_frame(&mut client, &Request::Ping).await);
        let received: Option<Request> = assert_ok!(read_frame(&mut server).await);
        assert_eq!(received, Some(Request::Ping));

        drop(client);
        let eof: Option<Request> = assert_ok!(read_frame(&mut server).await);
        assert!(eof.is_none());
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let len = (MAX_FRAME_LEN as u32 + 1).to_le_bytes();
        client.write_all(&len).await.unwrap();

        let result: Result<Option<Request>> = read_frame(&mut server).await;
        assert!(result.is_err());
    }
}
