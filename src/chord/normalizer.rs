//! Canonical and display forms of a chord
//!
//! The canonical form (`ShortcutSpec`) is what the settings store persists
//! and what the hotkey registrar receives. Display labels are for the UI
//! only and are never written back.

use std::borrow::Cow;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::hotkey::{is_trigger_identifier, ModifierKind};
use crate::platform::Platform;

use super::classifier::CapturedChord;

/// Canonical persisted shortcut, e.g. `{ "modifier": "ctrl+shift", "key": "u" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutSpec {
    pub modifier: String,
    pub key: String,
}

/// Errors from parsing a stored shortcut
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShortcutError {
    #[error("shortcut has no modifier")]
    MissingModifier,

    #[error("unknown modifier token: {0:?}")]
    UnknownModifier(String),

    #[error("shortcut key must be a single letter, got {0:?}")]
    InvalidKey(String),
}

impl ShortcutSpec {
    /// Default shortcut offered on each platform
    pub fn platform_default(platform: Platform) -> Self {
        let (modifier, key) = match platform {
            Platform::MacOs => ("super+shift", "u"),
            Platform::Windows => ("alt", "r"),
            Platform::Linux | Platform::Other => ("ctrl+shift", "u"),
        };
        Self {
            modifier: modifier.to_string(),
            key: key.to_string(),
        }
    }

    /// Parse back into a chord.
    ///
    /// Accepts any token order and common aliases (`cmd`, `control`,
    /// `option`, ...), so hand-edited settings still load.
    pub fn to_chord(&self) -> Result<CapturedChord, ShortcutError> {
        let mut modifiers = BTreeSet::new();
        for token in self.modifier.split('+').map(str::trim) {
            if token.is_empty() {
                continue;
            }
            let kind = ModifierKind::from_token(token)
                .ok_or_else(|| ShortcutError::UnknownModifier(token.to_string()))?;
            modifiers.insert(kind);
        }
        if modifiers.is_empty() {
            return Err(ShortcutError::MissingModifier);
        }

        let key = self.key.trim();
        if !is_trigger_identifier(key) {
            return Err(ShortcutError::InvalidKey(self.key.clone()));
        }
        let trigger = key
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .ok_or_else(|| ShortcutError::InvalidKey(self.key.clone()))?;

        Ok(CapturedChord {
            modifiers: modifiers.into_iter().collect(),
            trigger,
        })
    }
}

impl From<&CapturedChord> for ShortcutSpec {
    fn from(chord: &CapturedChord) -> Self {
        to_backend_format(chord)
    }
}

/// Canonical backend form: modifier tokens in super, ctrl, alt, shift
/// order joined by `+`, and the lowercase trigger.
pub fn to_backend_format(chord: &CapturedChord) -> ShortcutSpec {
    let mut modifiers = chord.modifiers.clone();
    modifiers.sort();
    modifiers.dedup();

    let modifier = modifiers
        .iter()
        .map(ModifierKind::backend_token)
        .collect::<Vec<_>>()
        .join("+");

    ShortcutSpec {
        modifier,
        key: chord.trigger.to_ascii_lowercase().to_string(),
    }
}

/// Label for a raw modifier identifier on the named platform.
///
/// Identifiers that are not modifiers are returned unchanged.
pub fn format_modifier_display<'a>(identifier: &'a str, platform_name: &str) -> Cow<'a, str> {
    match ModifierKind::from_identifier(identifier) {
        Some(kind) => Cow::Borrowed(kind.display_label(Platform::from_name(platform_name))),
        None => Cow::Borrowed(identifier),
    }
}

/// Per-modifier labels in canonical order
pub fn modifier_labels(chord: &CapturedChord, platform: Platform) -> Vec<&'static str> {
    chord
        .modifiers
        .iter()
        .map(|kind| kind.display_label(platform))
        .collect()
}

/// Full label such as `Cmd+Shift+U`
pub fn display_shortcut(chord: &CapturedChord, platform: Platform) -> String {
    let mut parts: Vec<String> = modifier_labels(chord, platform)
        .into_iter()
        .map(str::to_string)
        .collect();
    parts.push(chord.trigger.to_ascii_uppercase().to_string());
    parts.join("+")
}
