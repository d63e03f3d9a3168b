//! Configuration for the synchronization engine.
//!
//! Layered configuration:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `PAIRSYNC_` and use double
//! underscores to separate nested levels:
//! - `PAIRSYNC_MAX_WATCHED_DIRS=16` sets `max_watched_dirs`
//! - `PAIRSYNC_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Path to the tab-delimited entries file
    #[serde(default = "default_entries_path")]
    pub entries_path: PathBuf,

    /// Upper bound on folders registered for change notifications in one
    /// cycle. Folders beyond the limit are dropped from that cycle's watch
    /// registration. The default mirrors the classic wait-primitive cap of
    /// 64 objects with one slot reserved for the control signal.
    #[serde(default = "default_max_watched_dirs")]
    pub max_watched_dirs: usize,

    /// Whether folder changes trigger reconciliation at startup
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default log level filter (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_entries_path() -> PathBuf {
    config_dir().join("entries.txt")
}
fn default_max_watched_dirs() -> usize {
    63
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "warn".to_string()
}

/// Per-user configuration directory, e.g. `~/.config/pairsync`.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pairsync")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            entries_path: default_entries_path(),
            max_watched_dirs: default_max_watched_dirs(),
            enabled: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from(config_dir().join("settings.toml"))
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path))
            // Layer in environment variables with PAIRSYNC_ prefix
            // Use double underscore (__) to separate nested levels
            .merge(
                Env::prefixed("PAIRSYNC_")
                    .map(|key| key.as_str().to_lowercase().replace("__", ".").into()),
            )
            .extract()
            .map_err(Box::new)
    }

    /// Save current configuration to file
    pub fn save(
        &self,
        path: impl AsRef<std::path::Path>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the user configuration directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = config_dir().join("settings.toml");

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        let settings = Settings::default();
        settings.save(&config_path)?;

        Ok(config_path)
    }
}
