//! Runtime configuration consumed by the lifecycle components.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::defaults::*;
use crate::asset::AssetKind;
use crate::hint::HintPolicy;

/// An sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl FromStr for Rgb {
    type Err = String;

    /// Parses `#rrggbb` (the leading `#` is optional).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("expected a colour like '#f5f7f3', got '{}'", s.trim()));
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string());
        Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl Rgb {
    /// Hex digits without the leading `#`, as written to the config file.
    pub fn to_hex(&self) -> String {
        format!("{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

/// Perspective camera placement.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub field_of_view: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub up: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            field_of_view: DEFAULT_FIELD_OF_VIEW,
            near: DEFAULT_NEAR_PLANE,
            far: DEFAULT_FAR_PLANE,
            position: DEFAULT_CAMERA_POSITION,
            up: DEFAULT_CAMERA_UP,
        }
    }
}

/// Orbit controls limits.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitConfig {
    pub enable_pan: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Radians.
    pub min_polar_angle: f32,
    /// Radians.
    pub max_polar_angle: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            enable_pan: false,
            damping_factor: DEFAULT_DAMPING_FACTOR,
            rotate_speed: DEFAULT_ROTATE_SPEED,
            min_distance: DEFAULT_MIN_DISTANCE,
            max_distance: DEFAULT_MAX_DISTANCE,
            min_polar_angle: DEFAULT_MIN_POLAR_ANGLE,
            max_polar_angle: DEFAULT_MAX_POLAR_ANGLE,
        }
    }
}

/// Settings passed to the engine when a rendering context is created.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub pixel_ratio: f32,
    pub clear_color: Rgb,
    pub camera: CameraConfig,
    pub controls: OrbitConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            pixel_ratio: DEFAULT_PIXEL_RATIO,
            clear_color: DEFAULT_CLEAR_COLOR,
            camera: CameraConfig::default(),
            controls: OrbitConfig::default(),
        }
    }
}

/// Ambient rotation for one asset kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoRotateConfig {
    /// How long rotation runs after the viewer becomes ready.
    pub window: Duration,
    /// Engine-specific speed value.
    pub speed: f32,
}

/// Everything a [`crate::viewer::ViewerHost`] needs besides its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    /// Time allowed in `Loading` before the viewer gives up.
    pub watchdog_timeout: Duration,
    /// Render tick interval while `Ready`.
    pub frame_interval: Duration,
    /// Interaction hint behaviour.
    pub hint: HintPolicy,
    pub point_cloud_rotation: AutoRotateConfig,
    pub mesh_rotation: AutoRotateConfig,
    pub render: RenderConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            watchdog_timeout: Duration::from_millis(DEFAULT_WATCHDOG_TIMEOUT_MS),
            frame_interval: Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS),
            hint: HintPolicy::default(),
            point_cloud_rotation: AutoRotateConfig {
                window: Duration::from_millis(DEFAULT_POINT_CLOUD_ROTATE_WINDOW_MS),
                speed: DEFAULT_POINT_CLOUD_ROTATE_SPEED,
            },
            mesh_rotation: AutoRotateConfig {
                window: Duration::from_millis(DEFAULT_MESH_ROTATE_WINDOW_MS),
                speed: DEFAULT_MESH_ROTATE_SPEED,
            },
            render: RenderConfig::default(),
        }
    }
}

impl ViewerConfig {
    /// Rotation settings for the given asset kind.
    pub fn rotation_for(&self, kind: AssetKind) -> AutoRotateConfig {
        match kind {
            AssetKind::PointCloud => self.point_cloud_rotation,
            AssetKind::Mesh => self.mesh_rotation,
        }
    }

    pub fn with_watchdog_timeout(mut self, timeout: Duration) -> Self {
        self.watchdog_timeout = timeout;
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn with_hint_policy(mut self, hint: HintPolicy) -> Self {
        self.hint = hint;
        self
    }

    pub fn with_rotation(mut self, kind: AssetKind, rotation: AutoRotateConfig) -> Self {
        match kind {
            AssetKind::PointCloud => self.point_cloud_rotation = rotation,
            AssetKind::Mesh => self.mesh_rotation = rotation,
        }
        self
    }

    pub fn with_render(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }
}
