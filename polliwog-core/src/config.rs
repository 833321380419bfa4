//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/polliwog/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/polliwog/` (~/.config/polliwog/)
//! - State/Logs: `$XDG_STATE_HOME/polliwog/` (~/.local/state/polliwog/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Remote feed account and endpoint
    #[serde(default)]
    pub feed: FeedConfig,

    /// Archive directory and filename templates
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote feed configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    /// Account email used for login
    pub username: Option<String>,

    /// Account password
    pub password: Option<String>,

    /// Feed base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.tadpoles.com".to_string()
}

fn default_timeout() -> u64 {
    60
}

/// Archive layout configuration
///
/// Templates use literal placeholder substitution. Recognized placeholders:
/// `%child%`, `%YYYY%`, `%MM%`, `%DD%` (both templates), plus `%keymd5%`
/// and `%imgkey%` (filename template only).
#[derive(Debug, Deserialize, Clone)]
pub struct ArchiveConfig {
    /// Directory template, expanded per event
    #[serde(default = "default_dir_template")]
    pub dir_template: String,

    /// Filename template (no extension), expanded per attachment
    #[serde(default = "default_file_template")]
    pub file_template: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            dir_template: default_dir_template(),
            file_template: default_file_template(),
        }
    }
}

fn default_dir_template() -> String {
    "./archive/%child%/%YYYY%/%MM%/".to_string()
}

fn default_file_template() -> String {
    "%YYYY%-%MM%-%DD%_%keymd5%".to_string()
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Returns the default config file path
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("polliwog").join("config.toml")
    }

    /// Returns the state directory (logs)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("polliwog")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("polliwog.log")
    }

    /// Load configuration from the default path.
    ///
    /// A missing file yields the default configuration (which will fail
    /// validation until credentials are supplied).
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| Error::Config(format!("invalid config: {}", e)))
    }

    /// Validate that everything a run needs is present.
    pub fn validate(&self) -> Result<()> {
        if self.feed.username.as_deref().unwrap_or("").is_empty() {
            return Err(Error::Config("feed.username is required".to_string()));
        }
        if self.feed.password.as_deref().unwrap_or("").is_empty() {
            return Err(Error::Config("feed.password is required".to_string()));
        }
        if self.archive.dir_template.is_empty() {
            return Err(Error::Config("archive.dir_template is required".to_string()));
        }
        if self.archive.file_template.is_empty() {
            return Err(Error::Config(
                "archive.file_template is required".to_string(),
            ));
        }
        Ok(())
    }
}
