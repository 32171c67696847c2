//! Default values and constants for all configuration settings.
//!
//! Timing constants are behavioural: the watchdog and hint timings are what
//! users and tests observe, so changing them changes the product.

use std::path::PathBuf;

use super::settings::*;
use super::viewer::Rgb;

// =============================================================================
// Lifecycle timing
// =============================================================================

/// Time a viewer may stay in `Loading` before the watchdog forces `Error`.
pub const DEFAULT_WATCHDOG_TIMEOUT_MS: u64 = 8_000;

/// Per-frame render tick interval (~60 fps).
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

// =============================================================================
// Interaction hint
// =============================================================================

/// How long the hint stays fully visible before fading (fixed-duration mode).
pub const DEFAULT_HINT_VISIBLE_MS: u64 = 2_500;

/// Hint fade transition duration.
pub const DEFAULT_HINT_FADE_MS: u64 = 1_000;

// =============================================================================
// Auto-rotation
// =============================================================================

/// Shortest allowed auto-rotate window.
pub const MIN_AUTO_ROTATE_WINDOW_MS: u64 = 3_000;

/// Longest allowed auto-rotate window.
pub const MAX_AUTO_ROTATE_WINDOW_MS: u64 = 5_000;

/// Point clouds rotate for the full window.
pub const DEFAULT_POINT_CLOUD_ROTATE_WINDOW_MS: u64 = 5_000;

/// Orbit-controls rotation speed for point clouds.
pub const DEFAULT_POINT_CLOUD_ROTATE_SPEED: f32 = 0.5;

/// Meshes rotate for the short window.
pub const DEFAULT_MESH_ROTATE_WINDOW_MS: u64 = 3_000;

/// Mesh rotation speed in degrees per second.
pub const DEFAULT_MESH_ROTATE_SPEED: f32 = 15.0;

// =============================================================================
// Rendering
// =============================================================================

pub const DEFAULT_PIXEL_RATIO: f32 = 1.0;

/// Storefront background colour behind the model.
pub const DEFAULT_CLEAR_COLOR: Rgb = Rgb(0xf5, 0xf7, 0xf3);

/// Vertical field of view in degrees.
pub const DEFAULT_FIELD_OF_VIEW: f32 = 65.0;

pub const DEFAULT_NEAR_PLANE: f32 = 0.1;

pub const DEFAULT_FAR_PLANE: f32 = 500.0;

pub const DEFAULT_CAMERA_POSITION: [f32; 3] = [0.0, 5.0, 12.0];

/// PLY scenes are captured Y-down.
pub const DEFAULT_CAMERA_UP: [f32; 3] = [0.0, -1.0, 0.0];

pub const DEFAULT_DAMPING_FACTOR: f32 = 0.05;

pub const DEFAULT_ROTATE_SPEED: f32 = 0.5;

pub const DEFAULT_MIN_DISTANCE: f32 = 3.0;

pub const DEFAULT_MAX_DISTANCE: f32 = 30.0;

pub const DEFAULT_MIN_POLAR_ANGLE: f32 = 0.1;

pub const DEFAULT_MAX_POLAR_ANGLE: f32 = std::f32::consts::PI * 0.75;

// =============================================================================
// Logging
// =============================================================================

/// Default log file name.
pub const DEFAULT_LOG_FILE_NAME: &str = "splatview.log";

/// Default log file path (~/.splatview/splatview.log).
pub fn default_log_file() -> PathBuf {
    super::file::config_directory().join(DEFAULT_LOG_FILE_NAME)
}

/// Clamps an auto-rotate window to the allowed range, warning when clamped.
pub(super) fn clamp_rotate_window(value: u64) -> u64 {
    if value < MIN_AUTO_ROTATE_WINDOW_MS {
        tracing::warn!(
            requested = value,
            min = MIN_AUTO_ROTATE_WINDOW_MS,
            max = MAX_AUTO_ROTATE_WINDOW_MS,
            "auto-rotate window below minimum, clamping to {}",
            MIN_AUTO_ROTATE_WINDOW_MS
        );
        MIN_AUTO_ROTATE_WINDOW_MS
    } else if value > MAX_AUTO_ROTATE_WINDOW_MS {
        tracing::warn!(
            requested = value,
            min = MIN_AUTO_ROTATE_WINDOW_MS,
            max = MAX_AUTO_ROTATE_WINDOW_MS,
            "auto-rotate window above maximum, clamping to {}",
            MAX_AUTO_ROTATE_WINDOW_MS
        );
        MAX_AUTO_ROTATE_WINDOW_MS
    } else {
        value
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            viewer: ViewerSettings {
                watchdog_timeout_ms: DEFAULT_WATCHDOG_TIMEOUT_MS,
                frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            },
            hint: HintSettings {
                mode: HintMode::Fixed,
                visible_ms: DEFAULT_HINT_VISIBLE_MS,
                fade_ms: DEFAULT_HINT_FADE_MS,
            },
            rotation: RotationSettings {
                point_cloud_window_ms: DEFAULT_POINT_CLOUD_ROTATE_WINDOW_MS,
                point_cloud_speed: DEFAULT_POINT_CLOUD_ROTATE_SPEED,
                mesh_window_ms: DEFAULT_MESH_ROTATE_WINDOW_MS,
                mesh_speed: DEFAULT_MESH_ROTATE_SPEED,
            },
            render: RenderSettings {
                pixel_ratio: DEFAULT_PIXEL_RATIO,
                clear_color: DEFAULT_CLEAR_COLOR,
                field_of_view: DEFAULT_FIELD_OF_VIEW,
                rotate_speed: DEFAULT_ROTATE_SPEED,
                damping_factor: DEFAULT_DAMPING_FACTOR,
                min_distance: DEFAULT_MIN_DISTANCE,
                max_distance: DEFAULT_MAX_DISTANCE,
            },
            logging: LoggingSettings {
                file: default_log_file(),
            },
        }
    }
}
