//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/pgviz/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/pgviz/` (~/.config/pgviz/)
//! - Data: `$XDG_DATA_HOME/pgviz/` (~/.local/share/pgviz/)
//! - State/Logs: `$XDG_STATE_HOME/pgviz/` (~/.local/state/pgviz/)

use crate::error::{Error, Result};
use crate::types::GeminiModel;
use serde::Deserialize;
use std::path::PathBuf;

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

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
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
    /// Gemini assistant configuration
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Saved-plan store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Gemini assistant configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GeminiConfig {
    /// API key (a key saved through the store takes precedence)
    pub api_key: Option<String>,

    /// Model variant to call
    #[serde(default)]
    pub model: GeminiModel,

    /// API endpoint (optional, defaults to the public endpoint)
    pub endpoint: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_gemini_timeout")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: GeminiModel::default(),
            endpoint: None,
            timeout_secs: default_gemini_timeout(),
        }
    }
}

impl GeminiConfig {
    /// Default endpoint for the Gemini API
    pub fn default_endpoint() -> &'static str {
        "https://generativelanguage.googleapis.com"
    }

    /// Resolved endpoint, honoring the override
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(Self::default_endpoint())
    }
}

fn default_gemini_timeout() -> u64 {
    60
}

/// Saved-plan store configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Root directory for the file-backed store (defaults to the data dir)
    pub root: Option<PathBuf>,

    /// Maximum number of saved plans kept before eviction
    #[serde(default = "default_plan_capacity")]
    pub capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: None,
            capacity: default_plan_capacity(),
        }
    }
}

impl StoreConfig {
    /// Resolved store root directory
    pub fn root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(Config::data_dir)
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::Config(
                "store.capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_plan_capacity() -> usize {
    50
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.store.validate()?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/pgviz/config.toml` (~/.config/pgviz/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("pgviz").join("config.toml")
    }

    /// Returns the data directory path (for the saved-plan store)
    ///
    /// `$XDG_DATA_HOME/pgviz/` (~/.local/share/pgviz/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("pgviz")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/pgviz/` (~/.local/state/pgviz/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("pgviz")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/pgviz/pgviz.log` (~/.local/state/pgviz/pgviz.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("pgviz.log")
    }
}
