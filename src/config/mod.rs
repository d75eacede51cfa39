//! Configuration file support for slotsave.
//!
//! Settings are read from `~/.config/slotsave/config.toml`. They choose the
//! save root, cap the size of state blobs, and toggle screenshots and the
//! legacy import. If no config file exists, defaults are used.

pub mod enums;
pub mod types;

pub use enums::StorageMode;
pub use types::{MigrationConfig, ScreenshotConfig, StorageConfig};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure containing all user settings.
///
/// # Example TOML
/// ```toml
/// [storage]
/// mode = "custom"
/// custom_directory = "~/emulator/saves"
/// max_state_size_mb = 64
///
/// [screenshots]
/// enabled = true
///
/// [migration]
/// enabled = true
/// ```
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    /// Save root and size limits
    #[serde(default)]
    pub storage: StorageConfig,

    /// Preview image settings
    #[serde(default)]
    pub screenshots: ScreenshotConfig,

    /// Legacy single-slot import
    #[serde(default)]
    pub migration: MigrationConfig,
}

impl Config {
    /// Clamps values to acceptable ranges, logging a warning for each fix.
    ///
    /// - `storage.max_state_size_mb`: 1 - 1024
    fn validate_and_clamp(&mut self) {
        if !(1..=1024).contains(&self.storage.max_state_size_mb) {
            log::warn!(
                "Invalid max_state_size_mb {}, clamping to 1-1024 range",
                self.storage.max_state_size_mb
            );
            self.storage.max_state_size_mb = self.storage.max_state_size_mb.clamp(1, 1024);
        }

        if self.storage.mode == StorageMode::Custom
            && self
                .storage
                .custom_directory
                .as_deref()
                .is_none_or(|dir| dir.trim().is_empty())
        {
            log::warn!("storage.mode = \"custom\" without custom_directory, falling back to auto");
            self.storage.mode = StorageMode::Auto;
        }
    }

    /// Returns the path to the configuration file.
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined (e.g., HOME not set).
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("slotsave");

        Ok(config_dir.join("config.toml"))
    }

    /// Loads configuration from the default location, or returns defaults if not found.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Loads configuration from `config_path`, or returns defaults if the file is missing.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or is not valid TOML.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!("Config file not found, using defaults");
            debug!("Expected config at: {}", config_path.display());
            return Ok(Self::default());
        }

        let config_str = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

        config.validate_and_clamp();

        info!("Loaded config from {}", config_path.display());
        debug!("Config: {:?}", config);

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config::load_from(&temp.path().join("config.toml")).unwrap();
        assert_eq!(config.storage.mode, StorageMode::Auto);
        assert_eq!(config.storage.max_state_size_mb, 64);
        assert!(config.screenshots.enabled);
        assert!(config.migration.enabled);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "[storage]\nmode = \"custom\"\ncustom_directory = \"/srv/saves\"\n\n[migration]\nenabled = false\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.storage.mode, StorageMode::Custom);
        assert_eq!(config.storage.custom_directory.as_deref(), Some("/srv/saves"));
        assert!(!config.migration.enabled);
        assert!(config.screenshots.enabled);
    }

    #[test]
    fn out_of_range_size_is_clamped() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[storage]\nmax_state_size_mb = 0\n").unwrap();
        assert_eq!(Config::load_from(&path).unwrap().storage.max_state_size_mb, 1);

        fs::write(&path, "[storage]\nmax_state_size_mb = 99999\n").unwrap();
        assert_eq!(
            Config::load_from(&path).unwrap().storage.max_state_size_mb,
            1024
        );
    }

    #[test]
    fn custom_mode_without_directory_falls_back_to_auto() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[storage]\nmode = \"custom\"\n").unwrap();
        assert_eq!(Config::load_from(&path).unwrap().storage.mode, StorageMode::Auto);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[storage\nmode = ").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
