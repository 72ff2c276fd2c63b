//! Hotkey module for raw key-down intake
//!
//! Defines key identifiers and modifiers, and the listener that feeds
//! key-downs into a capture session while it is armed.

mod keys;
mod listener;

pub use keys::{is_trigger_identifier, ModifierKind, RawKeyEvent};
pub use listener::{KeyDisposition, KeyEventListener};
