//!
//! Configuration loading and layering for ToolBridge.
//!
//! Sources are applied in order, later ones overriding earlier ones key by key:
//! built-in defaults, the system file, the user file (or an explicit file),
//! then `TOOLBRIDGE_*` environment variables.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::collections::HashMap;
use std::path::Path;

use crate::config::{paths, Config, LogLevel};
use crate::error::{BridgeError, Result};

/* --- constants ------------------------------------------------------------------------------- */

/// Prefix of all recognised environment variables
const ENV_PREFIX: &str = "TOOLBRIDGE_";

/* --- types ----------------------------------------------------------------------------------- */

///
/// Builder that layers configuration sources.
pub struct ConfigLoader {
    /** configuration as merged so far */
    config: Config,
    /** `TOOLBRIDGE_*` variables, prefix stripped */
    env_overrides: HashMap<String, String>,
}

/* --- implementations --------------------------------------------------------------------- */

impl ConfigLoader {
    /// Create a new configuration loader holding built-in defaults
    pub fn new() -> Self {
        Self { config: Config::default(), env_overrides: HashMap::new() }
    }

    /// Reset to built-in defaults
    pub fn with_defaults(mut self) -> Self {
        self.config = Config::default();
        self
    }

    /// Merge the system configuration file if it exists
    ///
    /// # Returns
    /// * `Ok(Self)` - Loader with system configuration merged
    /// * `Err(BridgeError)` - File exists but could not be parsed
    pub fn with_system_config(self) -> Result<Self> {
        let path = paths::system_config_file()?;
        if path.exists() {
            tracing::debug!("Loading system configuration from {}", path.display());
            return self.with_config_file(path);
        }
        Ok(self)
    }

    /// Merge the user configuration file if it exists
    ///
    /// # Returns
    /// * `Ok(Self)` - Loader with user configuration merged
    /// * `Err(BridgeError)` - File exists but could not be parsed
    pub fn with_user_config(self) -> Result<Self> {
        let path = paths::user_config_file()?;
        if path.exists() {
            tracing::debug!("Loading user configuration from {}", path.display());
            return self.with_config_file(path);
        }
        Ok(self)
    }

    /// Merge a specific configuration file
    ///
    /// # Arguments
    /// * `path` - TOML file to merge on top of the current configuration
    ///
    /// # Returns
    /// * `Ok(Self)` - Loader with the file merged
    /// * `Err(BridgeError)` - File missing, unreadable or not valid TOML
    pub fn with_config_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let overlay = load_config_file(path.as_ref())?;
        self.config = merge_into(&self.config, overlay)?;
        Ok(self)
    }

    /// Collect `TOOLBRIDGE_*` environment variables
    pub fn with_env_vars(mut self) -> Result<Self> {
        for (key, value) in std::env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                self.env_overrides.insert(stripped.to_string(), value);
            }
        }
        Ok(self)
    }

    /// Apply environment overrides and return the final configuration
    ///
    /// # Returns
    /// * `Ok(Config)` - Merged configuration
    /// * `Err(BridgeError)` - An environment variable has an unparsable value
    pub fn build(mut self) -> Result<Config> {
        let overrides = std::mem::take(&mut self.env_overrides);
        let mut keys: Vec<&String> = overrides.keys().collect();
        keys.sort();
        for key in keys {
            apply_env_override(&mut self.config, key, &overrides[key])?;
        }
        Ok(self.config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/* --- private functions ----------------------------------------------------------------------- */

/// Read and parse a configuration file into a TOML table
fn load_config_file(path: &Path) -> Result<toml::Table> {
    paths::validate_config_file(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| {
        BridgeError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
    })?;
    content.parse::<toml::Table>().map_err(|e| {
        BridgeError::Config(format!(
            "Failed to parse TOML configuration file '{}': {}\n\
             \n\
             Run 'toolbridge config init' to write a fresh example file.",
            path.display(),
            e
        ))
    })
}

/// Deep-merge a TOML table over the current configuration
fn merge_into(base: &Config, overlay: toml::Table) -> Result<Config> {
    let mut merged = toml::Value::try_from(base)
        .map_err(|e| BridgeError::Config(format!("Failed to serialize configuration: {}", e)))?;
    if let toml::Value::Table(table) = &mut merged {
        merge_tables(table, overlay);
    }
    merged
        .try_into::<Config>()
        .map_err(|e| BridgeError::Config(format!("Invalid configuration value: {}", e)))
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge_tables(existing, nested);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Apply one prefix-stripped environment variable
fn apply_env_override(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let var = format!("{}{}", ENV_PREFIX, key);
    match key {
        "SERVER_PORT" => {
            config.server.port = value
                .parse()
                .map_err(|_| BridgeError::Config(format!("Invalid port value '{}' in {}", value, var)))?;
        }
        "SERVER_LOG_LEVEL" => config.server.log_level = LogLevel::parse(value)?,
        "SERVER_LOG_FILE" => {
            config.server.log_file = (!value.trim().is_empty()).then(|| value.to_string());
        }
        "SERVER_VERBOSE" => config.server.verbose = parse_bool_env(value, &var)?,
        "SERVER_DEFAULT_USER" => config.server.default_user = value.to_string(),
        "UPSTREAM_PROD_CHAT_URL" => config.upstream.prod_chat_url = value.to_string(),
        "UPSTREAM_DEV_CHAT_URL" => config.upstream.dev_chat_url = value.to_string(),
        "UPSTREAM_STREAM_URL" => config.upstream.stream_url = value.to_string(),
        "UPSTREAM_TIMEOUT_SECS" => {
            config.upstream.timeout_secs = value
                .parse()
                .map_err(|_| BridgeError::Config(format!("Invalid timeout value '{}' in {}", value, var)))?;
        }
        "TOOLS_FORCE_PROMPT_MODE" => config.tools.force_prompt_mode = parse_bool_env(value, &var)?,
        "STREAMING_CONTENT_CHUNK_THRESHOLD" => {
            config.streaming.content_chunk_threshold = parse_usize_env(value, &var)?
        }
        "STREAMING_CONTENT_CHUNK_SIZE" => config.streaming.content_chunk_size = parse_usize_env(value, &var)?,
        "STREAMING_ARGUMENT_CHUNK_SIZE" => config.streaming.argument_chunk_size = parse_usize_env(value, &var)?,
        "STREAMING_CHANNEL_CAPACITY" => config.streaming.channel_capacity = parse_usize_env(value, &var)?,
        _ => tracing::debug!("Ignoring unknown environment variable {}", var),
    }
    Ok(())
}

/// Parse boolean environment variable value
fn parse_bool_env(value: &str, var_name: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(BridgeError::Config(format!(
            "Invalid boolean value '{}' for {}. Use: true/false, 1/0, yes/no, or on/off",
            value, var_name
        ))),
    }
}

fn parse_usize_env(value: &str, var_name: &str) -> Result<usize> {
    value
        .parse()
        .map_err(|_| BridgeError::Config(format!("Invalid numeric value '{}' for {}", value, var_name)))
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_only() {
        let config = ConfigLoader::new().with_defaults().build().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server]\nport = 9000\n\n[streaming]\nargument_chunk_size = 16\n").unwrap();

        let config = ConfigLoader::new().with_config_file(&path).unwrap().build().unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.default_user, "toolbridge");
        assert_eq!(config.streaming.argument_chunk_size, 16);
        assert_eq!(config.streaming.content_chunk_threshold, 2048);
    }

    #[test]
    fn test_later_file_overrides_earlier() {
        let dir = TempDir::new().unwrap();
        let system = dir.path().join("system.toml");
        let user = dir.path().join("user.toml");
        fs::write(&system, "[server]\nport = 8000\ndefault_user = \"ops\"\n").unwrap();
        fs::write(&user, "[server]\nport = 9000\n").unwrap();

        let config = ConfigLoader::new()
            .with_config_file(&system)
            .unwrap()
            .with_config_file(&user)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.default_user, "ops");
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server]\nport = 9000\n").unwrap();

        temp_env::with_vars(
            [
                ("TOOLBRIDGE_SERVER_PORT", Some("9100")),
                ("TOOLBRIDGE_TOOLS_FORCE_PROMPT_MODE", Some("yes")),
                ("TOOLBRIDGE_UPSTREAM_TIMEOUT_SECS", Some("30")),
            ],
            || {
                let config = ConfigLoader::new()
                    .with_config_file(&path)
                    .unwrap()
                    .with_env_vars()
                    .unwrap()
                    .build()
                    .unwrap();
                assert_eq!(config.server.port, 9100);
                assert!(config.tools.force_prompt_mode);
                assert_eq!(config.upstream.timeout_secs, 30);
            },
        );
    }

    #[test]
    fn test_invalid_env_value_is_error() {
        temp_env::with_var("TOOLBRIDGE_SERVER_PORT", Some("not-a-port"), || {
            let result = ConfigLoader::new().with_env_vars().unwrap().build();
            assert!(result.is_err());
        });
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server\nport = ").unwrap();

        let error = ConfigLoader::new().with_config_file(&path).err().unwrap();
        assert!(error.to_string().contains("Failed to parse TOML"));
    }

    #[test]
    fn test_wrong_value_type_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server]\nport = \"high\"\n").unwrap();

        assert!(ConfigLoader::new().with_config_file(&path).is_err());
    }

    #[test]
    fn test_parse_bool_env() {
        assert!(parse_bool_env("ON", "X").unwrap());
        assert!(!parse_bool_env("0", "X").unwrap());
        assert!(parse_bool_env("maybe", "X").is_err());
    }
}
