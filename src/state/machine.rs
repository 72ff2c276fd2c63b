//! Capture controller state machine
//!
//! Handles transitions between Idle, Armed, Capturing and Resolved based
//! on start/cancel requests, key-downs and debounce timer expiry. Every
//! timed operation takes the current instant, so the machine itself never
//! reads a clock; only [`CaptureController::run`] does.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::chord::{
    classify, to_backend_format, CapturedChord, ChordAccumulator, ChordRejection, DebounceTimer,
};
use crate::events::CaptureEvent;
use crate::hotkey::{KeyDisposition, KeyEventListener, RawKeyEvent};

use super::handle::CaptureCommand;

/// The four states of a capture controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    /// Not listening
    #[default]
    Idle,
    /// Listening, no keys yet
    Armed,
    /// Keys arriving, debounce timer pending
    Capturing,
    /// A chord was accepted
    Resolved,
}

impl std::fmt::Display for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureState::Idle => write!(f, "Idle"),
            CaptureState::Armed => write!(f, "Armed"),
            CaptureState::Capturing => write!(f, "Capturing"),
            CaptureState::Resolved => write!(f, "Resolved"),
        }
    }
}

/// Result of one finalize
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Accepted(CapturedChord),
    Rejected(ChordRejection),
}

/// Point-in-time view of a controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSnapshot {
    pub state: CaptureState,
    /// Whether key-downs are currently being consumed
    pub listening: bool,
    pub result: Option<CapturedChord>,
    pub debounce_window: Duration,
}

/// Callback invoked with every accepted chord
pub type OnCapture = Box<dyn FnMut(CapturedChord) + Send>;

/// Capture controller: the only component callers talk to
pub struct CaptureController {
    state: CaptureState,
    /// Bumped on every start and cancel; keys from older sessions are dropped
    generation: u64,
    listener: KeyEventListener,
    accumulator: ChordAccumulator,
    result: Option<CapturedChord>,
    on_capture: OnCapture,
}

impl CaptureController {
    /// Create an idle controller
    pub fn new<F>(debounce_window: Duration, on_capture: F) -> Self
    where
        F: FnMut(CapturedChord) + Send + 'static,
    {
        Self {
            state: CaptureState::Idle,
            generation: 0,
            listener: KeyEventListener::new(),
            accumulator: ChordAccumulator::new(debounce_window),
            result: None,
            on_capture: Box::new(on_capture),
        }
    }

    /// Get the current state
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Chord accepted by the current session, if any
    pub fn result(&self) -> Option<&CapturedChord> {
        self.result.as_ref()
    }

    /// The pending debounce timer, if any
    pub fn pending_timer(&self) -> Option<DebounceTimer> {
        self.accumulator.timer()
    }

    pub fn snapshot(&self) -> CaptureSnapshot {
        CaptureSnapshot {
            state: self.state,
            listening: self.listener.is_attached(),
            result: self.result.clone(),
            debounce_window: self.accumulator.window(),
        }
    }

    /// Begin a new session, discarding any previous burst or result
    pub fn start(&mut self) {
        self.generation += 1;
        self.accumulator.reset();
        self.result = None;
        self.listener.attach(self.generation);
        self.transition_to(CaptureState::Armed);
    }

    /// Stop listening and drop all session state. No-op when idle.
    pub fn cancel(&mut self) {
        if self.state == CaptureState::Idle {
            return;
        }
        self.generation += 1;
        self.listener.detach();
        self.accumulator.reset();
        self.result = None;
        self.transition_to(CaptureState::Idle);
    }

    /// Arm or disarm the controller
    pub fn set_enabled(&mut self, enabled: bool) {
        match (enabled, self.state) {
            (true, CaptureState::Idle | CaptureState::Resolved) => self.start(),
            (true, CaptureState::Armed | CaptureState::Capturing) => {}
            (false, _) => self.cancel(),
        }
    }

    /// Feed one key-down from the host
    pub fn key_down(&mut self, event: RawKeyEvent, now: Instant) -> KeyDisposition {
        let Some(key) = self.listener.intercept(event) else {
            return KeyDisposition::Ignored;
        };
        if key.generation != self.generation {
            debug!(
                key_generation = key.generation,
                generation = self.generation,
                "dropping key from stale session"
            );
            return KeyDisposition::Ignored;
        }

        match self.state {
            CaptureState::Armed => {
                self.accumulator.press(key.event.key_identifier, now);
                self.transition_to(CaptureState::Capturing);
            }
            CaptureState::Capturing => {
                let timer = self.accumulator.press(key.event.key_identifier, now);
                debug!(
                    held = self.accumulator.held().len(),
                    token = timer.token,
                    "debounce timer re-armed"
                );
            }
            CaptureState::Idle | CaptureState::Resolved => return KeyDisposition::Ignored,
        }

        KeyDisposition::Consumed
    }

    /// Debounce timer callback.
    ///
    /// Does nothing unless `timer` is the one still pending for this
    /// session and has expired at `now`.
    pub fn fire_timer(&mut self, timer: DebounceTimer, now: Instant) -> Option<CaptureOutcome> {
        if self.state != CaptureState::Capturing {
            return None;
        }
        let held = self.accumulator.take_expired(timer, now)?;
        Some(self.finalize(held))
    }

    /// Fire the pending timer if it has expired at `now`
    pub fn poll(&mut self, now: Instant) -> Option<CaptureOutcome> {
        let timer = self.pending_timer()?;
        self.fire_timer(timer, now)
    }

    /// Classify the burst. The held set is already gone by the time this
    /// runs, accepted or not.
    fn finalize(&mut self, held: HashSet<String>) -> CaptureOutcome {
        match classify(&held) {
            Ok(chord) => {
                let spec = to_backend_format(&chord);
                info!(modifier = %spec.modifier, key = %spec.key, "chord captured");

                self.listener.detach();
                self.result = Some(chord.clone());
                self.transition_to(CaptureState::Resolved);
                (self.on_capture)(chord.clone());
                CaptureOutcome::Accepted(chord)
            }
            Err(reason) => {
                debug!(%reason, held = held.len(), "burst rejected, waiting for next attempt");
                self.transition_to(CaptureState::Armed);
                CaptureOutcome::Rejected(reason)
            }
        }
    }

    fn transition_to(&mut self, new_state: CaptureState) {
        let old_state = self.state;
        if old_state == new_state {
            return;
        }
        info!(
            from = %old_state,
            to = %new_state,
            generation = self.generation,
            "capture state transition"
        );
        self.state = new_state;
    }

    /// Run the controller, processing commands and timer expiry on one task.
    ///
    /// Returns when every command sender is dropped. Any in-flight timer is
    /// discarded without invoking the callback.
    pub async fn run(
        &mut self,
        mut commands: mpsc::Receiver<CaptureCommand>,
        events: broadcast::Sender<CaptureEvent>,
    ) {
        info!("capture controller started in Idle state");

        loop {
            let timer = self.pending_timer();
            let deadline = timer.map(|t| t.deadline).unwrap_or_else(Instant::now);

            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(command) => self.handle_command(command, &events),
                        None => break,
                    }
                }
                _ = sleep_until(deadline), if timer.is_some() => {
                    if let Some(timer) = timer {
                        self.fire_timer(timer, Instant::now());
                    }
                }
            }
        }

        self.cancel();
        info!("capture controller stopped");
    }

    fn handle_command(&mut self, command: CaptureCommand, events: &broadcast::Sender<CaptureEvent>) {
        match command {
            CaptureCommand::Start { reply } => {
                self.start();
                self.emit(events, CaptureEvent::CaptureArmed);
                let _ = reply.send(self.state);
            }
            CaptureCommand::Cancel { reply } => {
                let was_idle = self.state == CaptureState::Idle;
                self.cancel();
                if !was_idle {
                    self.emit(events, CaptureEvent::CaptureCancelled);
                }
                let _ = reply.send(self.state);
            }
            CaptureCommand::SetEnabled { enabled, reply } => {
                let before = self.state;
                self.set_enabled(enabled);
                match (before, self.state) {
                    (CaptureState::Idle | CaptureState::Resolved, CaptureState::Armed) => {
                        self.emit(events, CaptureEvent::CaptureArmed);
                    }
                    (b, CaptureState::Idle) if b != CaptureState::Idle => {
                        self.emit(events, CaptureEvent::CaptureCancelled);
                    }
                    _ => {}
                }
                let _ = reply.send(self.state);
            }
            CaptureCommand::KeyDown { event, reply } => {
                let disposition = self.key_down(event, Instant::now());
                let _ = reply.send(disposition);
            }
            CaptureCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn emit(&self, events: &broadcast::Sender<CaptureEvent>, event: CaptureEvent) {
        debug!(%event, "emitting capture event");
        let _ = events.send(event);
    }
}
