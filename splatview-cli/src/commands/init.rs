//! `splatview init` - write a default config file.

use std::path::PathBuf;

use splatview::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Write the default configuration to `path` (or the default location).
pub fn run(path: Option<PathBuf>, force: bool) -> Result<(), CliError> {
    let path = path.unwrap_or_else(config_file_path);

    if force {
        ConfigFile::default().save_to(&path)?;
        println!("Wrote default configuration to {}", path.display());
    } else if ConfigFile::ensure_exists_at(&path)? {
        println!("Created configuration file at {}", path.display());
    } else {
        println!(
            "Configuration file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    Ok(())
}
