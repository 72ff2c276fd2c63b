//! Command channel into a running capture controller

use tokio::sync::{mpsc, oneshot};

use crate::hotkey::{KeyDisposition, RawKeyEvent};

use super::machine::{CaptureSnapshot, CaptureState};

/// Commands processed by [`CaptureController::run`](super::CaptureController::run)
#[derive(Debug)]
pub enum CaptureCommand {
    Start {
        reply: oneshot::Sender<CaptureState>,
    },
    Cancel {
        reply: oneshot::Sender<CaptureState>,
    },
    SetEnabled {
        enabled: bool,
        reply: oneshot::Sender<CaptureState>,
    },
    KeyDown {
        event: RawKeyEvent,
        reply: oneshot::Sender<KeyDisposition>,
    },
    Snapshot {
        reply: oneshot::Sender<CaptureSnapshot>,
    },
}

/// Errors talking to the controller task
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture controller is not running")]
    ControllerGone,
}

/// Cloneable sender side of the controller's command channel
#[derive(Debug, Clone)]
pub struct CaptureHandle {
    tx: mpsc::Sender<CaptureCommand>,
}

/// Create a command channel for one controller
pub fn channel(buffer: usize) -> (CaptureHandle, mpsc::Receiver<CaptureCommand>) {
    let (tx, rx) = mpsc::channel(buffer);
    (CaptureHandle { tx }, rx)
}

impl CaptureHandle {
    pub async fn start(&self) -> Result<CaptureState, CaptureError> {
        self.request(|reply| CaptureCommand::Start { reply }).await
    }

    pub async fn cancel(&self) -> Result<CaptureState, CaptureError> {
        self.request(|reply| CaptureCommand::Cancel { reply }).await
    }

    pub async fn set_enabled(&self, enabled: bool) -> Result<CaptureState, CaptureError> {
        self.request(|reply| CaptureCommand::SetEnabled { enabled, reply })
            .await
    }

    /// Forward a key-down; the disposition tells the host whether to
    /// suppress its default handling
    pub async fn key_down(&self, key: impl Into<String>) -> Result<KeyDisposition, CaptureError> {
        let event = RawKeyEvent::new(key);
        self.request(|reply| CaptureCommand::KeyDown { event, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<CaptureSnapshot, CaptureError> {
        self.request(|reply| CaptureCommand::Snapshot { reply }).await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> CaptureCommand,
    ) -> Result<T, CaptureError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| CaptureError::ControllerGone)?;
        response.await.map_err(|_| CaptureError::ControllerGone)
    }
}
