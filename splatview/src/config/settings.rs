//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use super::viewer::Rgb;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Lifecycle timing
    pub viewer: ViewerSettings,
    /// Interaction hint behaviour
    pub hint: HintSettings,
    /// Ambient rotation per asset kind
    pub rotation: RotationSettings,
    /// Camera, controls and clear colour
    pub render: RenderSettings,
    /// Log file location
    pub logging: LoggingSettings,
}

/// `[viewer]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerSettings {
    /// Loading watchdog in milliseconds.
    pub watchdog_timeout_ms: u64,
    /// Render tick interval in milliseconds.
    pub frame_interval_ms: u64,
}

/// Which hint variant to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintMode {
    /// Visible for a fixed interval, then fades.
    Fixed,
    /// Visible until the first drag or touch move, then fades.
    Interaction,
}

impl FromStr for HintMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(HintMode::Fixed),
            "interaction" => Ok(HintMode::Interaction),
            other => Err(format!("unknown hint mode '{}'", other)),
        }
    }
}

impl fmt::Display for HintMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HintMode::Fixed => f.write_str("fixed"),
            HintMode::Interaction => f.write_str("interaction"),
        }
    }
}

/// `[hint]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintSettings {
    pub mode: HintMode,
    /// Fully visible duration (fixed mode only).
    pub visible_ms: u64,
    /// Fade transition duration.
    pub fade_ms: u64,
}

/// `[rotation]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationSettings {
    pub point_cloud_window_ms: u64,
    pub point_cloud_speed: f32,
    pub mesh_window_ms: u64,
    pub mesh_speed: f32,
}

/// `[render]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub pixel_ratio: f32,
    pub clear_color: Rgb,
    pub field_of_view: f32,
    pub rotate_speed: f32,
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Log file path.
    pub file: PathBuf,
}
