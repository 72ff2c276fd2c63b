//! Host platform detection
//!
//! The platform only affects presentation (modifier labels) and the
//! default shortcut offered during onboarding. It never changes the
//! canonical form that gets persisted.

use serde::{Deserialize, Serialize};

/// Platform family used for display purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "macos")]
    MacOs,
    #[serde(rename = "windows")]
    Windows,
    #[serde(rename = "linux")]
    Linux,
    #[serde(rename = "unknown")]
    Other,
}

impl Platform {
    /// Platform the daemon was compiled for
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else {
            Self::Other
        }
    }

    /// Parse a platform name as reported by the UI layer.
    ///
    /// Matching is case-insensitive. Anything unrecognized maps to
    /// [`Platform::Other`], which renders the generic "Super" label.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "macos" | "darwin" | "mac" | "osx" => Self::MacOs,
            "windows" | "win32" | "win" => Self::Windows,
            "linux" => Self::Linux,
            _ => Self::Other,
        }
    }

    /// Canonical lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            Self::MacOs => "macos",
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::Other => "unknown",
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
