//! Configuration for splatview.
//!
//! Two layers:
//!
//! - **Runtime config** ([`ViewerConfig`], [`RenderConfig`], ...) - the typed
//!   structs the lifecycle components consume. Built with `Default` plus
//!   `with_*` methods.
//! - **Config file** ([`ConfigFile`]) - the INI file at
//!   `~/.splatview/config.ini`, one settings struct per `[section]`, converted
//!   to runtime config with [`ConfigFile::viewer_config`].
//!
//! # Example
//!
//! ```
//! use splatview::config::ViewerConfig;
//! use splatview::hint::HintPolicy;
//! use std::time::Duration;
//!
//! let config = ViewerConfig::default()
//!     .with_watchdog_timeout(Duration::from_secs(10))
//!     .with_hint_policy(HintPolicy::until_interaction());
//! assert_eq!(config.watchdog_timeout, Duration::from_secs(10));
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod viewer;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    ConfigFile, HintMode, HintSettings, LoggingSettings, RenderSettings, RotationSettings,
    ViewerSettings,
};
pub use viewer::{AutoRotateConfig, CameraConfig, OrbitConfig, RenderConfig, Rgb, ViewerConfig};
