//! Key identifiers and modifier definitions
//!
//! Identifiers follow the names the settings window reports for each
//! key-down ("Control", "Shift", "Meta", "u", ...).

use serde::{Deserialize, Serialize};

use crate::platform::Platform;

/// Key identifiers recognized as modifiers
pub mod identifiers {
    /// Command on macOS, Windows key elsewhere
    pub const META: &str = "Meta";
    /// Alternate name some hosts report for Meta
    pub const SUPER: &str = "Super";
    pub const CONTROL: &str = "Control";
    pub const ALT: &str = "Alt";
    pub const SHIFT: &str = "Shift";
}

/// One key-down as delivered by the host input system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawKeyEvent {
    pub key_identifier: String,
}

impl RawKeyEvent {
    pub fn new(key_identifier: impl Into<String>) -> Self {
        Self {
            key_identifier: key_identifier.into(),
        }
    }
}

/// A modifier key.
///
/// Variant order is the canonical order used everywhere a chord is
/// rendered or persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    Super,
    Control,
    Alt,
    Shift,
}

impl ModifierKind {
    /// All modifiers in canonical order
    pub const ALL: [ModifierKind; 4] = [Self::Super, Self::Control, Self::Alt, Self::Shift];

    /// Map a raw key identifier to a modifier, if it is one
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        match identifier {
            identifiers::META | identifiers::SUPER => Some(Self::Super),
            identifiers::CONTROL => Some(Self::Control),
            identifiers::ALT => Some(Self::Alt),
            identifiers::SHIFT => Some(Self::Shift),
            _ => None,
        }
    }

    /// Map a persisted token (any case, common aliases) to a modifier
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "super" | "cmd" | "command" | "meta" | "win" => Some(Self::Super),
            "ctrl" | "control" => Some(Self::Control),
            "alt" | "option" => Some(Self::Alt),
            "shift" => Some(Self::Shift),
            _ => None,
        }
    }

    /// Canonical lowercase token written to configuration storage
    pub fn backend_token(&self) -> &'static str {
        match self {
            Self::Super => "super",
            Self::Control => "ctrl",
            Self::Alt => "alt",
            Self::Shift => "shift",
        }
    }

    /// Human-readable label for the given platform
    pub fn display_label(&self, platform: Platform) -> &'static str {
        match self {
            Self::Super => match platform {
                Platform::MacOs => "Cmd",
                Platform::Windows => "Win",
                Platform::Linux | Platform::Other => "Super",
            },
            Self::Control => "Ctrl",
            Self::Alt => "Alt",
            Self::Shift => "Shift",
        }
    }
}

/// Whether an identifier can serve as the trigger key: exactly one ASCII letter
pub fn is_trigger_identifier(identifier: &str) -> bool {
    let mut chars = identifier.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_alphabetic())
}
