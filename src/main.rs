//! shortcut-capture-daemon: shortcut capture for the usage overlay
//!
//! The overlay is shown and hidden by a user-chosen global shortcut. This
//! daemon owns the capture step of choosing it:
//! - Accepts key-downs from the settings window over IPC
//! - Groups near-simultaneous presses into one chord with a debounce timer
//! - Validates the chord (modifiers plus one letter) and normalizes it
//!   into the canonical `{ modifier, key }` form and platform labels
//!
//! Registering the shortcut with the OS and persisting it are left to the
//! settings collaborator.

mod chord;
mod config;
mod events;
mod hotkey;
mod ipc;
mod lifecycle;
mod platform;
mod state;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::events::CaptureEvent;
use crate::ipc::{capture_notifier, Server};
use crate::lifecycle::ShutdownSignal;
use crate::state::CaptureController;

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
        "shortcut-capture-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(
        ?config.socket_path,
        platform = %config.platform,
        debounce_ms = config.debounce_window.as_millis() as u64,
        "configuration loaded"
    );

    let mut shutdown = ShutdownSignal::install().context("failed to install signal handlers")?;

    // IPC server -> controller commands, controller -> subscribers events
    let (capture, commands) = state::channel(32);
    let (event_tx, _event_rx) = broadcast::channel::<CaptureEvent>(64);

    let mut controller = CaptureController::new(
        config.debounce_window,
        capture_notifier(event_tx.clone(), config.platform),
    );

    let server = Server::new(&config.socket_path, capture, event_tx.clone(), config.platform)?;

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        _ = controller.run(commands, event_tx) => {
            info!("capture controller exited");
        }

        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    controller.cancel();
    server.shutdown().await;

    info!("shortcut-capture-daemon stopped");

    Ok(())
}
