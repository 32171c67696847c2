//! Configuration file handling for ~/.splatview/config.ini.
//!
//! Settings structs live in [`super::settings`], constants in [`super::defaults`],
//! parsing in [`super::parser`], and serialization in [`super::writer`].

use ini::Ini;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use super::settings::{ConfigFile, HintMode};
use super::viewer::{AutoRotateConfig, RenderConfig, ViewerConfig};
use crate::hint::HintPolicy;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.splatview/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Create the config file at `path` with defaults if it doesn't exist.
    ///
    /// Returns true if a file was written.
    pub fn ensure_exists_at(path: &Path) -> Result<bool, ConfigFileError> {
        if path.exists() {
            return Ok(false);
        }
        Self::default().save_to(path)?;
        Ok(true)
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        Self::ensure_exists_at(&path)?;
        Ok(path)
    }

    /// Converts file settings into the runtime viewer configuration.
    pub fn viewer_config(&self) -> ViewerConfig {
        let hint = match self.hint.mode {
            HintMode::Fixed => HintPolicy::FixedDuration {
                visible_for: Duration::from_millis(self.hint.visible_ms),
                fade: Duration::from_millis(self.hint.fade_ms),
            },
            HintMode::Interaction => HintPolicy::UntilInteraction {
                fade: Duration::from_millis(self.hint.fade_ms),
            },
        };

        let mut render = RenderConfig::default();
        render.pixel_ratio = self.render.pixel_ratio;
        render.clear_color = self.render.clear_color;
        render.camera.field_of_view = self.render.field_of_view;
        render.controls.rotate_speed = self.render.rotate_speed;
        render.controls.damping_factor = self.render.damping_factor;
        render.controls.min_distance = self.render.min_distance;
        render.controls.max_distance = self.render.max_distance;

        ViewerConfig {
            watchdog_timeout: Duration::from_millis(self.viewer.watchdog_timeout_ms),
            frame_interval: Duration::from_millis(self.viewer.frame_interval_ms),
            hint,
            point_cloud_rotation: AutoRotateConfig {
                window: Duration::from_millis(self.rotation.point_cloud_window_ms),
                speed: self.rotation.point_cloud_speed,
            },
            mesh_rotation: AutoRotateConfig {
                window: Duration::from_millis(self.rotation.mesh_window_ms),
                speed: self.rotation.mesh_speed,
            },
            render,
        }
    }
}

/// Get the path to the config directory (~/.splatview).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".splatview")
}

/// Get the path to the config file (~/.splatview/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();

        assert_eq!(config.viewer.watchdog_timeout_ms, DEFAULT_WATCHDOG_TIMEOUT_MS);
        assert_eq!(config.hint.mode, HintMode::Fixed);
        assert_eq!(config.hint.visible_ms, 2_500);
        assert_eq!(config.rotation.mesh_window_ms, 3_000);
        assert!(config.logging.file.ends_with("splatview.log"));
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp_dir.path().join("missing.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_default_viewer_config_matches_runtime_default() {
        assert_eq!(ConfigFile::default().viewer_config(), ViewerConfig::default());
    }

    #[test]
    fn test_interaction_mode_maps_to_policy() {
        let mut config = ConfigFile::default();
        config.hint.mode = HintMode::Interaction;
        config.hint.fade_ms = 500;

        assert_eq!(
            config.viewer_config().hint,
            HintPolicy::UntilInteraction {
                fade: Duration::from_millis(500)
            }
        );
    }

    #[test]
    fn test_ensure_exists_at_writes_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.ini");

        assert!(ConfigFile::ensure_exists_at(&path).unwrap());
        assert!(path.exists());
        assert!(!ConfigFile::ensure_exists_at(&path).unwrap());
    }
}
