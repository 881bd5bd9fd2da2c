//!
//! Configuration validation for ToolBridge.
//!
//! Checks network settings, upstream endpoints and streaming limits. Problems
//! that make the bridge unusable are errors; questionable but workable values
//! are warnings.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::fmt;

use crate::config::{Config, LogLevel};
use crate::error::{BridgeError, Result};

/* --- types ----------------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    Error,
    Warning,
}

///
/// A single finding produced by [`ConfigValidator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: ValidationSeverity,
    /** dotted configuration key, e.g. `streaming.channel_capacity` */
    pub field: String,
    pub message: String,
}

///
/// Configuration validator collecting all findings before reporting.
pub struct ConfigValidator<'a> {
    /** configuration to validate */
    config: &'a Config,
    /** findings in discovery order */
    issues: Vec<ValidationIssue>,
}

/* --- implementations --------------------------------------------------------------------- */

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl<'a> ConfigValidator<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config, issues: Vec::new() }
    }

    /// Run every check and return all findings
    pub fn issues(mut self) -> Vec<ValidationIssue> {
        self.validate_server_config();
        self.validate_upstream_config();
        self.validate_streaming_config();
        self.issues
    }

    /// Perform configuration validation
    ///
    /// Warnings are logged; any error fails validation.
    ///
    /// # Returns
    /// * `Ok(())` - Configuration is valid
    /// * `Err(BridgeError)` - One or more errors, listed in the message
    pub fn validate(self) -> Result<()> {
        let issues = self.issues();
        let (errors, warnings): (Vec<_>, Vec<_>) =
            issues.iter().partition(|issue| issue.severity == ValidationSeverity::Error);

        for warning in &warnings {
            tracing::warn!("Configuration warning: {}", warning);
        }

        if !errors.is_empty() {
            let listing = errors
                .iter()
                .enumerate()
                .map(|(i, e)| format!("{}. {}", i + 1, e))
                .collect::<Vec<_>>()
                .join("\n");
            return Err(BridgeError::Config(format!(
                "Configuration validation failed with {} error(s):\n\n{}\n\n\
                 Run 'toolbridge config show' to inspect the effective configuration.",
                errors.len(),
                listing
            )));
        }

        tracing::debug!("Configuration validation passed with {} warning(s)", warnings.len());
        Ok(())
    }

    /* --- private validation methods ------------------------------------------------------ */

    fn validate_server_config(&mut self) {
        let server = &self.config.server;

        if server.port == 0 {
            self.add_error("server.port", "port must be between 1 and 65535".to_string());
        } else if server.port < 1024 {
            self.add_warning(
                "server.port",
                format!("port {} requires root/administrator privileges", server.port),
            );
        }

        if server.default_user.trim().is_empty() {
            self.add_error("server.default_user", "default user cannot be empty".to_string());
        }

        if server.log_level == LogLevel::Trace {
            self.add_warning(
                "server.log_level",
                "trace logging records request payloads and user names".to_string(),
            );
        }
    }

    fn validate_upstream_config(&mut self) {
        let upstream = &self.config.upstream;
        for (field, url) in [
            ("upstream.prod_chat_url", &upstream.prod_chat_url),
            ("upstream.dev_chat_url", &upstream.dev_chat_url),
            ("upstream.stream_url", &upstream.stream_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                self.add_error(field, format!("'{}' is not an http(s) URL", url));
            } else if url.starts_with("http://") {
                self.add_warning(field, format!("'{}' is not using TLS", url));
            }
        }

        if upstream.timeout_secs == 0 {
            self.add_error("upstream.timeout_secs", "timeout cannot be zero".to_string());
        } else if upstream.timeout_secs > 1800 {
            self.add_warning(
                "upstream.timeout_secs",
                format!("long timeout ({}s) keeps stalled requests open", upstream.timeout_secs),
            );
        }
    }

    fn validate_streaming_config(&mut self) {
        let streaming = &self.config.streaming;

        if streaming.channel_capacity == 0 {
            self.add_error("streaming.channel_capacity", "channel capacity cannot be zero".to_string());
        }
        if streaming.content_chunk_size == 0 {
            self.add_error("streaming.content_chunk_size", "chunk size cannot be zero".to_string());
        }
        if streaming.content_chunk_size > streaming.content_chunk_threshold {
            self.add_warning(
                "streaming.content_chunk_size",
                format!(
                    "chunk size {} exceeds the split threshold {}; split content uses larger deltas than unsplit content",
                    streaming.content_chunk_size, streaming.content_chunk_threshold
                ),
            );
        }
    }

    fn add_error(&mut self, field: &str, message: String) {
        self.issues.push(ValidationIssue { severity: ValidationSeverity::Error, field: field.to_string(), message });
    }

    fn add_warning(&mut self, field: &str, message: String) {
        self.issues.push(ValidationIssue { severity: ValidationSeverity::Warning, field: field.to_string(), message });
    }
}

/* --- tests ------------------------------------------------------------------------------- */
