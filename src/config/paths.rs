//!
//! Where ToolBridge looks for configuration files.
//!
//! The user file lives in the platform config directory resolved by
//! `directories` (`~/.config/toolbridge` on Linux). The system file is
//! `/etc/toolbridge/config.toml` on Unix and under `%PROGRAMDATA%` on Windows.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::error::{BridgeError, Result};

/* --- constants ------------------------------------------------------------------------------- */

const APP_NAME: &str = "toolbridge";
const CONFIG_FILE_NAME: &str = "config.toml";

/* --- public functions ------------------------------------------------------------------------ */

/// User configuration file; the directory is not created here.
pub fn user_config_file() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "SkyCorp", APP_NAME)
        .ok_or_else(|| BridgeError::Config("Unable to determine the home directory for this user".to_string()))?;
    Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// System-wide configuration file.
pub fn system_config_file() -> Result<PathBuf> {
    let dir = if cfg!(windows) {
        std::env::var("PROGRAMDATA")
            .map(PathBuf::from)
            .map_err(|_| BridgeError::Config("PROGRAMDATA is not set".to_string()))?
    } else {
        PathBuf::from("/etc")
    };
    Ok(dir.join(APP_NAME).join(CONFIG_FILE_NAME))
}

/// Expand `~` and `$VAR` references, e.g. in `server.log_file`
///
/// # Arguments
/// * `path` - Path that may reference the home directory or variables
///
/// # Returns
/// * `Ok(PathBuf)` - Expanded path
/// * `Err(BridgeError)` - A referenced variable or the home directory is unknown
pub fn expand_path<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let raw = path.as_ref().to_string_lossy();
    shellexpand::full(&raw)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .map_err(|e| BridgeError::Config(format!("Failed to expand path '{}': {}", raw, e)))
}

/// Fails unless `path` is a readable regular file.
pub fn validate_config_file<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if !path.is_file() {
        let problem = if path.exists() { "is not a regular file" } else { "does not exist" };
        return Err(BridgeError::Config(format!("Configuration file '{}' {}", path.display(), problem)));
    }
    std::fs::File::open(path).map(drop).map_err(|e| {
        BridgeError::Config(format!("Configuration file '{}' cannot be read: {}", path.display(), e))
    })
}

/// Configuration file paths, highest priority first
pub fn config_file_paths() -> Vec<PathBuf> {
    [user_config_file(), system_config_file()].into_iter().filter_map(|p| p.ok()).collect()
}

/* --- tests ----------------------------------------------------------------------------------- */
