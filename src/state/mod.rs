//! State machine module for shortcut capture
//!
//! Provides an explicit state machine with four states:
//! - Idle: not listening for keys
//! - Armed: listening, waiting for the first key of a burst
//! - Capturing: keys arriving, debounce timer pending
//! - Resolved: a valid chord was captured

mod handle;
mod machine;

pub use handle::{channel, CaptureError, CaptureHandle};
pub use machine::{CaptureController, CaptureState};
