//!
//! CLI configuration commands for ToolBridge.
//!
//! - `config init [--force]` - write the example configuration file
//! - `config show` - display the effective configuration
//! - `config validate` - validate the effective configuration
//! - `config path` - list configuration file locations
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::fs;
use std::path::Path;

use crate::config::validation::{ConfigValidator, ValidationSeverity};
use crate::config::{paths, Config};
use crate::error::{BridgeError, Result};

/* --- types ----------------------------------------------------------------------------------- */

///
/// CLI configuration command handler.
pub struct ConfigCli;

/* --- implementations --------------------------------------------------------------------- */

impl ConfigCli {
    /// Dispatch a `config` subcommand
    ///
    /// # Arguments
    /// * `args` - arguments following `config`
    pub fn run(args: &[String]) -> Result<()> {
        match args.first().map(String::as_str) {
            Some("init") => {
                let force = args.iter().any(|a| a == "--force" || a == "-f");
                Self::init(&paths::user_config_file()?, force)
            }
            Some("show") | None => Self::show(),
            Some("validate") => Self::validate(),
            Some("path") => {
                Self::path();
                Ok(())
            }
            Some(other) => Err(BridgeError::Config(format!(
                "Unknown config command '{}'. Available: init, show, validate, path",
                other
            ))),
        }
    }

    /// Handle the `config init` command
    ///
    /// # Arguments
    /// * `config_file` - destination of the example configuration
    /// * `force` - overwrite an existing file
    ///
    /// # Returns
    /// * `Ok(())` - File written, or left alone because it exists
    /// * `Err(BridgeError)` - Directory or file could not be written
    pub fn init(config_file: &Path, force: bool) -> Result<()> {
        if config_file.exists() && !force {
            println!("Configuration file already exists at: {}", config_file.display());
            println!("Use 'toolbridge config init --force' to overwrite it.");
            return Ok(());
        }

        if let Some(config_dir) = config_file.parent() {
            fs::create_dir_all(config_dir).map_err(|e| {
                BridgeError::Config(format!(
                    "Failed to create config directory '{}': {}",
                    config_dir.display(),
                    e
                ))
            })?;
        }

        fs::write(config_file, Config::example_toml()).map_err(|e| {
            BridgeError::Config(format!(
                "Failed to write configuration file '{}': {}",
                config_file.display(),
                e
            ))
        })?;

        println!("[OK] Configuration saved to: {}", config_file.display());
        println!("Run 'toolbridge config validate' to verify it.");
        Ok(())
    }

    /// Handle the `config show` command
    pub fn show() -> Result<()> {
        let config = Config::load()?;
        let rendered = toml::to_string_pretty(&config)
            .map_err(|e| BridgeError::Config(format!("Failed to serialize configuration: {}", e)))?;

        println!("# Effective ToolBridge configuration");
        println!();
        println!("{}", rendered);
        Self::path();
        Ok(())
    }

    /// Handle the `config validate` command
    ///
    /// # Returns
    /// * `Ok(())` - Configuration is valid (warnings allowed)
    /// * `Err(BridgeError)` - Configuration failed to load or validate
    pub fn validate() -> Result<()> {
        let config = Config::load()?;
        let issues = ConfigValidator::new(&config).issues();

        if issues.is_empty() {
            println!("[OK] Configuration is valid");
        }
        for issue in &issues {
            let tag = match issue.severity {
                ValidationSeverity::Error => "[ERROR]",
                ValidationSeverity::Warning => "[WARNING]",
            };
            println!("  {} {}", tag, issue);
        }

        config.validate()
    }

    /// Handle the `config path` command
    pub fn path() {
        println!("Configuration Sources (highest priority first):");
        println!("  TOOLBRIDGE_* environment variables");
        for path in paths::config_file_paths() {
            let status = if path.exists() { "exists" } else { "not found" };
            println!("  {} ({})", path.display(), status);
        }
    }
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_example() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("nested").join("config.toml");
        ConfigCli::init(&file, false).unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), Config::example_toml());
    }

    #[test]
    fn test_init_keeps_existing_without_force() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("config.toml");
        fs::write(&file, "[server]\nport = 1\n").unwrap();

        ConfigCli::init(&file, false).unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "[server]\nport = 1\n");

        ConfigCli::init(&file, true).unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), Config::example_toml());
    }

    #[test]
    fn test_unknown_subcommand() {
        assert!(ConfigCli::run(&["explode".to_string()]).is_err());
    }
}
