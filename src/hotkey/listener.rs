//! Key-down listener attached to a capture session
//!
//! The listener does not interpret keys. While attached it consumes every
//! key-down and tags it with the session generation it was attached for,
//! so the controller can drop anything that belongs to an older session.

use tracing::{debug, trace};

use super::keys::RawKeyEvent;

/// What the host should do with a key-down after the listener saw it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    /// Listener took the key; the host suppresses its default handling
    Consumed,
    /// No capture in progress; the host handles the key normally
    Ignored,
}

impl KeyDisposition {
    pub fn is_consumed(&self) -> bool {
        matches!(self, Self::Consumed)
    }
}

/// A key-down forwarded by an attached listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenedKey {
    /// Session generation the listener was attached for
    pub generation: u64,
    pub event: RawKeyEvent,
}

/// Subscription to the host key-down stream
#[derive(Debug, Default)]
pub struct KeyEventListener {
    /// Generation of the session currently subscribed, if any
    attached: Option<u64>,
    /// Keys forwarded since the last attach
    forwarded: u64,
}

impl KeyEventListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe on behalf of the given session, replacing any older one
    pub fn attach(&mut self, generation: u64) {
        if let Some(previous) = self.attached.replace(generation) {
            debug!(previous, generation, "key listener re-attached");
        } else {
            debug!(generation, "key listener attached");
        }
        self.forwarded = 0;
    }

    /// Unsubscribe; takes effect before the next key is seen
    pub fn detach(&mut self) {
        if let Some(generation) = self.attached.take() {
            debug!(generation, forwarded = self.forwarded, "key listener detached");
        }
    }

    /// Check whether the listener is subscribed
    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    /// Intercept one key-down from the host.
    ///
    /// Returns the tagged key when attached. Repeats are forwarded as-is.
    pub fn intercept(&mut self, event: RawKeyEvent) -> Option<ListenedKey> {
        let generation = self.attached?;
        self.forwarded += 1;
        trace!(key = %event.key_identifier, generation, "key intercepted");
        Some(ListenedKey { generation, event })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_creation() {
        let listener = KeyEventListener::new();
        assert!(!listener.is_attached());
    }

    #[test]
    fn test_detached_listener_ignores_keys() {
        let mut listener = KeyEventListener::new();
        assert!(listener.intercept(RawKeyEvent::new("u")).is_none());

        listener.attach(3);
        listener.detach();
        assert!(listener.intercept(RawKeyEvent::new("u")).is_none());
    }

    #[test]
    fn test_forwards_repeats_verbatim() {
        let mut listener = KeyEventListener::new();
        listener.attach(7);

        let first = listener.intercept(RawKeyEvent::new("Control")).unwrap();
        let second = listener.intercept(RawKeyEvent::new("Control")).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.generation, 7);
        assert_eq!(first.event.key_identifier, "Control");
    }
}
