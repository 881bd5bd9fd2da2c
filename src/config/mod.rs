//!
//! Configuration management for ToolBridge.
//!
//! Layered configuration using platform-native directories, TOML files and
//! `TOOLBRIDGE_*` environment variables (highest priority). Every value has a
//! built-in default, so the bridge runs with no configuration file at all.
//!
//! - `loader.rs` - configuration loading and layering
//! - `paths.rs` - platform-native path resolution
//! - `validation.rs` - configuration validation
//! - `cli.rs` - `config` CLI subcommands
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- modules --------------------------------------------------------------------------------- */

pub mod cli;
pub mod loader;
pub mod paths;
pub mod validation;

/* --- uses ------------------------------------------------------------------------------------ */

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

pub use validation::{ValidationIssue, ValidationSeverity};

/* --- types ----------------------------------------------------------------------------------- */

///
/// Main application configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream gateway endpoints
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Tool-calling behaviour
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Streaming emulation settings
    #[serde(default)]
    pub streaming: StreamingConfig,
}

///
/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server port number
    #[serde(default = "default_port")]
    pub port: u16,
    /// Application logging level
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
    /// Optional log file receiving a copy of all log output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
    /// Force debug logging including truncated payload dumps
    #[serde(default)]
    pub verbose: bool,
    /// User reported upstream when the caller sends no usable bearer token
    #[serde(default = "default_user")]
    pub default_user: String,
}

///
/// Upstream chat gateway endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Chat endpoint of the production deployment
    #[serde(default = "default_prod_chat_url")]
    pub prod_chat_url: String,
    /// Chat endpoint of the development deployment
    #[serde(default = "default_dev_chat_url")]
    pub dev_chat_url: String,
    /// Incremental text streaming endpoint
    #[serde(default = "default_stream_url")]
    pub stream_url: String,
    /// Upstream request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

///
/// Tool-calling configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Use prompt-based tool calling even for families with native support
    #[serde(default)]
    pub force_prompt_mode: bool,
}

///
/// Streaming configuration.
///
/// Controls how finished results are replayed as deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Content longer than this many bytes is split into several deltas
    #[serde(default = "default_content_chunk_threshold")]
    pub content_chunk_threshold: usize,
    /// Target size in bytes of split content deltas
    #[serde(default = "default_content_chunk_size")]
    pub content_chunk_size: usize,
    /// Tool-call argument fragment size in chars (0 = whole arguments)
    #[serde(default)]
    pub argument_chunk_size: usize,
    /// Capacity of the bounded channel feeding the SSE response
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

///
/// Logging level enumeration.
///
/// Defines available log levels compatible with tracing crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/* --- defaults -------------------------------------------------------------------------------- */

/// Default HTTP port
fn default_port() -> u16 {
    7285
}

/// Default logging level
fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_user() -> String {
    "toolbridge".to_string()
}

fn default_prod_chat_url() -> String {
    "https://apps.inside.anl.gov/argoapi/api/v1/resource/chat/".to_string()
}

fn default_dev_chat_url() -> String {
    "https://apps-dev.inside.anl.gov/argoapi/api/v1/resource/chat/".to_string()
}

fn default_stream_url() -> String {
    "https://apps-dev.inside.anl.gov/argoapi/api/v1/resource/streamchat/".to_string()
}

/// Default upstream timeout (5 minutes)
fn default_timeout_secs() -> u64 {
    300
}

fn default_content_chunk_threshold() -> usize {
    2048
}

fn default_content_chunk_size() -> usize {
    512
}

fn default_channel_capacity() -> usize {
    64
}

/* --- implementations --------------------------------------------------------------------- */

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            log_level: default_log_level(),
            log_file: None,
            verbose: false,
            default_user: default_user(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            prod_chat_url: default_prod_chat_url(),
            dev_chat_url: default_dev_chat_url(),
            stream_url: default_stream_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            content_chunk_threshold: default_content_chunk_threshold(),
            content_chunk_size: default_content_chunk_size(),
            argument_chunk_size: 0,
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Config {
    /// Load configuration from the standard hierarchy:
    /// 1. Environment variables (highest priority)
    /// 2. User config file (~/.config/toolbridge/config.toml)
    /// 3. System config file (/etc/toolbridge/config.toml)
    /// 4. Built-in defaults (lowest priority)
    ///
    /// # Returns
    /// * `Ok(Config)` - Successfully loaded configuration
    /// * `Err(BridgeError)` - A file or variable could not be parsed
    pub fn load() -> Result<Self> {
        loader::ConfigLoader::new()
            .with_defaults()
            .with_system_config()?
            .with_user_config()?
            .with_env_vars()?
            .build()
    }

    /// Validate the current configuration
    ///
    /// # Returns
    /// * `Ok(())` - Configuration is valid
    /// * `Err(BridgeError)` - Configuration validation failed with details
    pub fn validate(&self) -> Result<()> {
        validation::ConfigValidator::new(self).validate()
    }

    /// Effective log level: `verbose` forces debug.
    pub fn effective_log_level(&self) -> LogLevel {
        match (self.server.verbose, self.server.log_level) {
            (true, LogLevel::Trace) => LogLevel::Trace,
            (true, _) => LogLevel::Debug,
            (false, level) => level,
        }
    }

    /// Get configuration file example as TOML string
    pub fn example_toml() -> &'static str {
        r#"# ToolBridge Configuration
# This file should be placed at:
#   Linux/Unix: ~/.config/toolbridge/config.toml
#   macOS: ~/Library/Application Support/toolbridge/config.toml
#   Windows: %APPDATA%/toolbridge/config.toml

[server]
# HTTP server port (default: 7285)
port = 7285

# Logging level: trace, debug, info, warn, error (default: info)
log_level = "info"

# Copy all log output into this file (default: unset)
# log_file = "~/.local/state/toolbridge/toolbridge.log"

# Debug logging with truncated request/response dumps (default: false)
verbose = false

# User reported upstream when no bearer token is sent (default: toolbridge)
default_user = "toolbridge"

[upstream]
prod_chat_url = "https://apps.inside.anl.gov/argoapi/api/v1/resource/chat/"
dev_chat_url = "https://apps-dev.inside.anl.gov/argoapi/api/v1/resource/chat/"
stream_url = "https://apps-dev.inside.anl.gov/argoapi/api/v1/resource/streamchat/"

# Upstream request timeout in seconds (default: 300)
timeout_secs = 300

[tools]
# Embed tools in the prompt even for models with native tool calling (default: false)
force_prompt_mode = false

[streaming]
# Content longer than this (bytes) is sent in several deltas (default: 2048)
content_chunk_threshold = 2048

# Target size of each content delta when splitting (default: 512)
content_chunk_size = 512

# Split tool-call arguments into fragments of this many chars, 0 = never (default: 0)
argument_chunk_size = 0

# Buffered SSE events per response (default: 64)
channel_capacity = 64
"#
    }
}

impl LogLevel {
    /// Check if trace/debug diagnostics are enabled
    pub fn is_trace_enabled(self) -> bool {
        matches!(self, LogLevel::Trace | LogLevel::Debug)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(BridgeError::Config(format!(
                "Invalid log level '{}'. Valid levels are: trace, debug, info, warn, error",
                s
            ))),
        }
    }
}

/* --- tests ----------------------------------------------------------------------------------- */
