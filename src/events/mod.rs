//! Events module for capture session notifications
//!
//! Pushed to subscribed IPC clients. Rejected bursts produce no event:
//! the UI simply keeps waiting for input.

use serde::{Deserialize, Serialize};

use crate::chord::ShortcutSpec;

/// Events emitted by the capture controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CaptureEvent {
    /// A capture session is waiting for keys
    CaptureArmed,

    /// The session was cancelled or disabled
    CaptureCancelled,

    /// A valid chord was captured
    ShortcutCaptured {
        /// Canonical modifier string, e.g. "ctrl+shift"
        modifier: String,
        /// Lowercase trigger letter
        key: String,
        /// Platform label, e.g. "Ctrl+Shift+U"
        display: String,
    },
}

impl CaptureEvent {
    pub fn captured(spec: ShortcutSpec, display: String) -> Self {
        Self::ShortcutCaptured {
            modifier: spec.modifier,
            key: spec.key,
            display,
        }
    }
}

impl std::fmt::Display for CaptureEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureEvent::CaptureArmed => write!(f, "CAPTURE_ARMED"),
            CaptureEvent::CaptureCancelled => write!(f, "CAPTURE_CANCELLED"),
            CaptureEvent::ShortcutCaptured { display, .. } => {
                write!(f, "SHORTCUT_CAPTURED ({})", display)
            }
        }
    }
}
