//! Application Configuration using Figment
//!
//! Configuration is loaded from, in increasing priority:
//! 1. Built-in defaults
//! 2. `config/fscc.toml` in the working directory, or `fscc/fscc.toml` under
//!    the platform config directory when the former is absent
//! 3. Environment variables prefixed with `FSCC_`, nested with `__`
//!    (`FSCC_APPLICATION__LOG_LEVEL=debug`)
//!
//! # Example
//! ```no_run
//! use fscc_settings::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! println!("Application: {}", config.application.name);
//! # Ok::<(), fscc_settings::error::SettingsError>(())
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::codec::SETTINGS_EXTENSION;
use crate::error::{AppResult, SettingsError};

/// Config file searched first, relative to the working directory.
pub const LOCAL_CONFIG_PATH: &str = "config/fscc.toml";

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const VALID_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Name and logging
    pub application: ApplicationConfig,
    /// Settings file locations
    pub settings: SettingsConfig,
    /// Port selection at startup
    pub ports: PortsConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Display name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    pub log_format: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "FSCC Settings".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

/// Settings file locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Document loaded by "defaults"
    pub defaults_path: PathBuf,
    /// Extension added to exported files that have none
    pub extension: String,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            defaults_path: PathBuf::from(format!("defaults.{SETTINGS_EXTENSION}")),
            extension: SETTINGS_EXTENSION.to_string(),
        }
    }
}

/// Port selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortsConfig {
    /// Port selected at startup when present
    pub preferred: Option<String>,
}

impl AppConfig {
    /// Load from the default location and environment variables
    pub fn load() -> AppResult<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific file path. A missing file falls back to defaults.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config: Self = Self::figment(path.as_ref()).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Provider chain used by [`AppConfig::load_from`]
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("FSCC_").split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let level = self.application.log_level.to_lowercase();
        if !VALID_LEVELS.contains(&level.as_str()) {
            return Err(SettingsError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                VALID_LEVELS.join(", ")
            )));
        }

        let format = self.application.log_format.to_lowercase();
        if !VALID_FORMATS.contains(&format.as_str()) {
            return Err(SettingsError::Configuration(format!(
                "Invalid log_format '{}'. Must be one of: {}",
                self.application.log_format,
                VALID_FORMATS.join(", ")
            )));
        }

        let extension = &self.settings.extension;
        if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SettingsError::Configuration(format!(
                "Invalid settings extension '{extension}'. Use letters and digits only, without a dot"
            )));
        }

        Ok(())
    }
}

/// `config/fscc.toml` when present, otherwise the per-user config file.
pub fn default_config_path() -> PathBuf {
    let local = PathBuf::from(LOCAL_CONFIG_PATH);
    if local.is_file() {
        return local;
    }
    dirs::config_dir()
        .map(|dir| dir.join("fscc").join("fscc.toml"))
        .unwrap_or(local)
}
