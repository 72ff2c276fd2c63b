//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::chord::DEFAULT_DEBOUNCE_WINDOW;
use crate::platform::Platform;

/// Environment variable overriding the debounce window, in milliseconds
pub const DEBOUNCE_ENV: &str = "SHORTCUT_CAPTURE_DEBOUNCE_MS";
/// Environment variable overriding the display platform
pub const PLATFORM_ENV: &str = "SHORTCUT_CAPTURE_PLATFORM";
/// Environment variable overriding the IPC socket path
pub const SOCKET_ENV: &str = "SHORTCUT_CAPTURE_SOCKET";

/// Errors in configuration values
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("HOME is not set")]
    MissingHome,

    #[error("SHORTCUT_CAPTURE_DEBOUNCE_MS must be a positive number of milliseconds, got {0:?}")]
    InvalidDebounce(String),
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Quiet period after the last key-down before a burst is finalized
    pub debounce_window: Duration,

    /// Platform used for display labels and the default shortcut
    pub platform: Platform,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = lookup("HOME").ok_or(ConfigError::MissingHome)?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("usage-overlay");

        let socket_path = lookup(SOCKET_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("shortcut.sock"));

        let debounce_window = match lookup(DEBOUNCE_ENV) {
            Some(raw) => parse_debounce(&raw).context("invalid debounce window")?,
            None => DEFAULT_DEBOUNCE_WINDOW,
        };

        let platform = lookup(PLATFORM_ENV)
            .map(|name| Platform::from_name(&name))
            .unwrap_or_else(Platform::current);

        Ok(Self {
            socket_path,
            data_dir,
            debounce_window,
            platform,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}

fn parse_debounce(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError::InvalidDebounce(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(lookup_from(&[("HOME", "/home/test")])).unwrap();
        assert_eq!(
            config.socket_path,
            PathBuf::from("/home/test/.local/share/usage-overlay/shortcut.sock")
        );
        assert_eq!(config.debounce_window, Duration::from_millis(150));
        assert_eq!(config.platform, Platform::current());
    }

    #[test]
    fn test_config_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("HOME", "/home/test"),
            (DEBOUNCE_ENV, "200"),
            (PLATFORM_ENV, "windows"),
            (SOCKET_ENV, "/tmp/capture.sock"),
        ]))
        .unwrap();
        assert_eq!(config.debounce_window, Duration::from_millis(200));
        assert_eq!(config.platform, Platform::Windows);
        assert_eq!(config.socket_path, PathBuf::from("/tmp/capture.sock"));
    }

    #[test]
    fn test_config_rejects_bad_debounce() {
        assert!(Config::from_lookup(lookup_from(&[("HOME", "/h"), (DEBOUNCE_ENV, "0")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("HOME", "/h"), (DEBOUNCE_ENV, "fast")])).is_err());
    }

    #[test]
    fn test_config_requires_home() {
        assert!(Config::from_lookup(lookup_from(&[])).is_err());
    }
}
