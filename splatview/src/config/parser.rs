//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;
use std::str::FromStr;

use super::defaults::clamp_rotate_window;
use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [viewer] section
    if let Some(section) = ini.section(Some("viewer")) {
        if let Some(v) = section.get("watchdog_timeout_ms") {
            config.viewer.watchdog_timeout_ms = parse_positive("viewer", "watchdog_timeout_ms", v)?;
        }
        if let Some(v) = section.get("frame_interval_ms") {
            config.viewer.frame_interval_ms = parse_positive("viewer", "frame_interval_ms", v)?;
        }
    }

    // [hint] section
    if let Some(section) = ini.section(Some("hint")) {
        if let Some(v) = section.get("mode") {
            config.hint.mode = v.parse().map_err(|reason| ConfigFileError::InvalidValue {
                section: "hint".to_string(),
                key: "mode".to_string(),
                value: v.to_string(),
                reason,
            })?;
        }
        if let Some(v) = section.get("visible_ms") {
            config.hint.visible_ms = parse_value("hint", "visible_ms", v)?;
        }
        if let Some(v) = section.get("fade_ms") {
            config.hint.fade_ms = parse_value("hint", "fade_ms", v)?;
        }
    }

    // [rotation] section
    if let Some(section) = ini.section(Some("rotation")) {
        if let Some(v) = section.get("point_cloud_window_ms") {
            config.rotation.point_cloud_window_ms =
                clamp_rotate_window(parse_value("rotation", "point_cloud_window_ms", v)?);
        }
        if let Some(v) = section.get("point_cloud_speed") {
            config.rotation.point_cloud_speed = parse_value("rotation", "point_cloud_speed", v)?;
        }
        if let Some(v) = section.get("mesh_window_ms") {
            config.rotation.mesh_window_ms =
                clamp_rotate_window(parse_value("rotation", "mesh_window_ms", v)?);
        }
        if let Some(v) = section.get("mesh_speed") {
            config.rotation.mesh_speed = parse_value("rotation", "mesh_speed", v)?;
        }
    }

    // [render] section
    if let Some(section) = ini.section(Some("render")) {
        if let Some(v) = section.get("pixel_ratio") {
            config.render.pixel_ratio = parse_value("render", "pixel_ratio", v)?;
        }
        if let Some(v) = section.get("clear_color") {
            config.render.clear_color =
                v.parse().map_err(|reason| ConfigFileError::InvalidValue {
                    section: "render".to_string(),
                    key: "clear_color".to_string(),
                    value: v.to_string(),
                    reason,
                })?;
        }
        if let Some(v) = section.get("field_of_view") {
            config.render.field_of_view = parse_value("render", "field_of_view", v)?;
        }
        if let Some(v) = section.get("rotate_speed") {
            config.render.rotate_speed = parse_value("render", "rotate_speed", v)?;
        }
        if let Some(v) = section.get("damping_factor") {
            config.render.damping_factor = parse_value("render", "damping_factor", v)?;
        }
        if let Some(v) = section.get("min_distance") {
            config.render.min_distance = parse_value("render", "min_distance", v)?;
        }
        if let Some(v) = section.get("max_distance") {
            config.render.max_distance = parse_value("render", "max_distance", v)?;
        }
        if config.render.min_distance > config.render.max_distance {
            return Err(ConfigFileError::InvalidValue {
                section: "render".to_string(),
                key: "min_distance".to_string(),
                value: config.render.min_distance.to_string(),
                reason: format!(
                    "must not exceed max_distance ({})",
                    config.render.max_distance
                ),
            });
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

fn parse_value<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError> {
    value.trim().parse().map_err(|_| ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: "must be a number".to_string(),
    })
}

fn parse_positive(section: &str, key: &str, value: &str) -> Result<u64, ConfigFileError> {
    let parsed: u64 = parse_value(section, key, value)?;
    if parsed == 0 {
        return Err(ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(parsed)
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
