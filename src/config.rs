//! Configuration for conprobe.
//!
//! The configuration file is located at `~/.conprobe/config.toml`:
//!
//! ```toml
//! # Switch the console to UTF-8 + ANSI escapes while running
//! force_utf8_console = true
//!
//! # Fail when the process ANSI codepage isn't UTF-8
//! require_utf8_os_api = false
//!
//! # trace, debug, info, warn, error (CONPROBE_LOG overrides)
//! log_level = "info"
//!
//! # Colored headings in reports
//! color = true
//! ```
//!
//! A missing or unreadable file gives the defaults.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Run commands inside a UTF-8 console session
    pub force_utf8_console: bool,
    /// Treat a non-UTF-8 process codepage as an error
    pub require_utf8_os_api: bool,
    /// Log filter directive
    pub log_level: String,
    /// Colored report headings
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            force_utf8_console: true,
            require_utf8_os_api: false,
            log_level: "info".to_string(),
            color: true,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Self {
        if let Some(path) = Self::get_config_path() {
            if path.exists() {
                if let Ok(content) = fs::read_to_string(&path) {
                    return Self::parse(&content);
                }
            }
        }
        Self::default()
    }

    /// Parse configuration text, falling back to defaults when it is invalid
    pub fn parse(content: &str) -> Self {
        toml::from_str(content).unwrap_or_default()
    }

    /// Get config file path
    fn get_config_path() -> Option<PathBuf> {
        app_dir().map(|dir| dir.join("config.toml"))
    }
}

/// `~/.conprobe`, where the config and log files live.
pub fn app_dir() -> Option<PathBuf> {
    home_dir().map(|home| home.join(".conprobe"))
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}
