//! Configuration module for thermolog
//!
//! This module handles:
//! - The application configuration file (`config.toml`): serial parameters,
//!   presentation periods, default output location
//! - Application state (`app_state.json`): last used port and save path,
//!   remembered across runs
//!
//! # Locations
//!
//! - **Config**: `<config dir>/dev.thermolog/config.toml`
//! - **State and logs**: `<data dir>/dev.thermolog/`
//!
//! Both files are optional; missing files mean defaults.
//!
//! # Example
//!
//! ```ignore
//! use thermolog::config::{AppConfig, AppState};
//!
//! let config = AppConfig::load_or_default();
//! let mut state = AppState::load_or_default();
//! state.remember_port("/dev/ttyUSB0");
//! state.save()?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{Result, ThermoLogError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config and data directories
pub const APP_ID: &str = "dev.thermolog";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// App state filename
pub const APP_STATE_FILE: &str = "app_state.json";

/// Log directory name inside the data directory
pub const LOG_DIR: &str = "logs";

// ==================== Directories ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Get the application config directory path
pub fn app_config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        ThermoLogError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            ThermoLogError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the config file
pub fn config_path() -> Option<PathBuf> {
    app_config_dir().map(|p| p.join(CONFIG_FILE))
}

/// Get the path to the app state file
pub fn app_state_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(APP_STATE_FILE))
}

/// Get the directory for rolling log files
pub fn log_dir() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(LOG_DIR))
}

// ==================== App Config ====================

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    /// Serial link parameters
    #[serde(default)]
    pub serial: SerialSettings,

    /// Chart and label refresh
    #[serde(default)]
    pub presentation: PresentationSettings,

    /// Where saved data goes by default
    #[serde(default)]
    pub persistence: PersistenceSettings,

    /// Ingest thread tuning
    #[serde(default)]
    pub ingest: IngestSettings,
}

impl AppConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a config file from an explicit path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ThermoLogError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            ThermoLogError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config from the default location
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        let path = config_path().ok_or_else(|| {
            ThermoLogError::Config("Could not determine config path".to_string())
        })?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(path)
    }

    /// Load config, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config to an explicit path as TOML
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ThermoLogError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ThermoLogError::Serialization(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            ThermoLogError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Reject values the ingest path cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.serial.baud_rate == 0 {
            return Err(ThermoLogError::Config("baud_rate must be positive".to_string()));
        }
        if self.serial.read_timeout_ms == 0 {
            return Err(ThermoLogError::Config(
                "read_timeout_ms must be positive".to_string(),
            ));
        }
        if self.presentation.chart_window == 0 {
            return Err(ThermoLogError::Config(
                "chart_window must be at least 1".to_string(),
            ));
        }
        if self.presentation.chart_refresh_ms == 0 || self.presentation.label_refresh_ms == 0 {
            return Err(ThermoLogError::Config(
                "refresh periods must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// ==================== App State ====================

/// Persistent application state
///
/// Remembers what the operator last used so the next run can preselect it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppState {
    /// Version for future migration support
    #[serde(default = "default_app_state_version")]
    pub version: u32,

    /// Last port that connected successfully
    #[serde(default)]
    pub last_port: Option<String>,

    /// Last file data was saved to
    #[serde(default)]
    pub last_save_path: Option<PathBuf>,
}

fn default_app_state_version() -> u32 {
    1
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            version: 1,
            last_port: None,
            last_save_path: None,
        }
    }
}

impl AppState {
    /// Load app state from an explicit path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ThermoLogError::Config(format!("Failed to read app state: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| ThermoLogError::Config(format!("Failed to parse app state: {}", e)))
    }

    /// Load app state from the default location
    pub fn load() -> Result<Self> {
        let path = app_state_path().ok_or_else(|| {
            ThermoLogError::Config("Could not determine app state path".to_string())
        })?;
        Self::load_from(path)
    }

    /// Load app state, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load app state, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save app state to an explicit path
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ThermoLogError::Serialization(format!("Failed to serialize app state: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| ThermoLogError::Config(format!("Failed to write app state: {}", e)))
    }

    /// Save app state to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(dir.join(APP_STATE_FILE))
    }

    /// Record a port that connected successfully
    pub fn remember_port(&mut self, port: impl Into<String>) {
        self.last_port = Some(port.into());
    }

    /// Record the file data was last saved to
    pub fn remember_save_path(&mut self, path: impl Into<PathBuf>) {
        self.last_save_path = Some(path.into());
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.serial.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.serial.read_timeout_ms, DEFAULT_READ_TIMEOUT_MS);
        assert_eq!(config.presentation.chart_window, DEFAULT_CHART_WINDOW);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_app_config_toml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = AppConfig::default();
        config.serial.default_port = Some("COM4".to_string());
        config.presentation.chart_window = 120;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[serial]\nbaud_rate = 9600\n").unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.serial.baud_rate, 9600);
        assert_eq!(loaded.serial.read_timeout_ms, DEFAULT_READ_TIMEOUT_MS);
        assert_eq!(loaded.presentation, PresentationSettings::default());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[presentation]\nchart_window = 0\n").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ThermoLogError::Config(_)));
    }

    #[test]
    fn test_app_state_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(APP_STATE_FILE);

        assert_eq!(AppState::load_from(&path).unwrap(), AppState::default());

        let mut state = AppState::default();
        state.remember_port("/dev/ttyACM0");
        state.remember_save_path("/tmp/run.csv");
        state.save_to(&path).unwrap();

        let loaded = AppState::load_from(&path).unwrap();
        assert_eq!(loaded.last_port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(loaded.last_save_path, Some(PathBuf::from("/tmp/run.csv")));
    }
}
