//! Chord accumulation, validation and normalization

mod accumulator;
mod classifier;
mod normalizer;

pub use accumulator::{ChordAccumulator, DebounceTimer, DEFAULT_DEBOUNCE_WINDOW};
pub use classifier::{classify, CapturedChord, ChordRejection};
pub use normalizer::{
    display_shortcut, format_modifier_display, modifier_labels, to_backend_format, ShortcutSpec,
};
