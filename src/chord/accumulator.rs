//! Held-key accumulation with a single debounce timer

use std::collections::HashSet;
use std::time::Duration;

use tokio::time::Instant;

/// Default debounce window between the last key-down and finalize
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(150);

/// The one pending debounce timer.
///
/// Tokens are unique for the lifetime of an accumulator, so a timer that
/// was replaced or cleared can always be told apart from the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceTimer {
    pub token: u64,
    pub deadline: Instant,
}

/// Keys seen during one capture burst plus the debounce timer
#[derive(Debug)]
pub struct ChordAccumulator {
    held: HashSet<String>,
    timer: Option<DebounceTimer>,
    window: Duration,
    next_token: u64,
}

impl ChordAccumulator {
    pub fn new(window: Duration) -> Self {
        Self {
            held: HashSet::new(),
            timer: None,
            window,
            next_token: 0,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a key-down and re-arm the timer.
    ///
    /// The previous timer, if any, is replaced in the same step; there is
    /// never more than one pending.
    pub fn press(&mut self, key: String, now: Instant) -> DebounceTimer {
        self.held.insert(key);

        self.next_token += 1;
        let timer = DebounceTimer {
            token: self.next_token,
            deadline: now + self.window,
        };
        self.timer = Some(timer);
        timer
    }

    /// Keys held in the current burst
    pub fn held(&self) -> &HashSet<String> {
        &self.held
    }

    /// The pending timer, if one is armed
    pub fn timer(&self) -> Option<DebounceTimer> {
        self.timer
    }

    /// Whether `timer` is the one currently pending
    pub fn is_current(&self, timer: DebounceTimer) -> bool {
        self.timer == Some(timer)
    }

    /// Take the burst if `timer` is live and has expired at `now`.
    ///
    /// On success the accumulator is left empty with no timer pending.
    pub fn take_expired(&mut self, timer: DebounceTimer, now: Instant) -> Option<HashSet<String>> {
        if !self.is_current(timer) || now < timer.deadline {
            return None;
        }
        self.timer = None;
        Some(std::mem::take(&mut self.held))
    }

    /// Drop the burst and any pending timer
    pub fn reset(&mut self) {
        self.held = HashSet::new();
        self.timer = None;
    }
}

impl Default for ChordAccumulator {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_WINDOW)
    }
}
