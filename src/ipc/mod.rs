//! IPC module for daemon-UI communication

mod protocol;
mod server;

pub use server::{capture_notifier, Server};
