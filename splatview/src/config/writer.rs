//! INI serialization logic for converting `ConfigFile` → INI string.

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[viewer]
; Milliseconds a viewer may spend loading before it shows the error state
watchdog_timeout_ms = {}
; Render tick interval while the model is on screen (16 = ~60 fps)
frame_interval_ms = {}

[hint]
; Interaction hint behaviour:
;   fixed       - visible for visible_ms, then fades out
;   interaction - visible until the first drag or touch move, then fades out
mode = {}
visible_ms = {}
; Fade transition length
fade_ms = {}

[rotation]
; Ambient rotation after the model appears. Windows are clamped to 3000-5000 ms.
point_cloud_window_ms = {}
point_cloud_speed = {}
mesh_window_ms = {}
; Degrees per second
mesh_speed = {}

[render]
pixel_ratio = {}
; Background colour behind the model (hex rrggbb)
clear_color = {}
; Vertical field of view in degrees
field_of_view = {}
rotate_speed = {}
damping_factor = {}
; Orbit zoom limits
min_distance = {}
max_distance = {}

[logging]
file = {}
"#,
        config.viewer.watchdog_timeout_ms,
        config.viewer.frame_interval_ms,
        config.hint.mode,
        config.hint.visible_ms,
        config.hint.fade_ms,
        config.rotation.point_cloud_window_ms,
        config.rotation.point_cloud_speed,
        config.rotation.mesh_window_ms,
        config.rotation.mesh_speed,
        config.render.pixel_ratio,
        config.render.clear_color.to_hex(),
        config.render.field_of_view,
        config.render.rotate_speed,
        config.render.damping_factor,
        config.render.min_distance,
        config.render.max_distance,
        config.logging.file.display(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::HintMode;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.viewer.watchdog_timeout_ms = 9_000;
        config.hint.mode = HintMode::Interaction;
        config.render.field_of_view = 50.0;
        config.save_to(&config_path).unwrap();

        let loaded = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_output_is_commented() {
        let content = to_config_string(&ConfigFile::default());
        assert!(content.contains("[viewer]"));
        assert!(content.contains("mode = fixed"));
        assert!(content.contains("clear_color = f5f7f3"));
        assert!(content.contains("; Degrees per second"));
    }
}
