//!
//! Error handling for the tool-calling bridge.
//!
//! Defines the error types shared by the translation core and the HTTP layer.
//! Validation failures carry a field path so clients can see which part of the
//! request was rejected; upstream failures carry the status they should be
//! surfaced with.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::fmt;

use thiserror::Error;

use crate::tools::ModelFamily;

/* --- types ----------------------------------------------------------------------------------- */

///
/// Enumerated reasons a request's tool section (or content) can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    EmptyToolName,
    InvalidToolName,
    DuplicateToolName,
    InvalidToolType,
    InvalidParameters,
    UnknownToolChoice,
    InvalidToolChoice,
    MissingField,
    UnsupportedContent,
}

///
/// Rejection of a caller-supplied structure, located by a field path such as
/// `tools[1].function.name`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at '{path}': {detail}")]
pub struct ValidationError {
    /** what went wrong */
    pub kind: ValidationErrorKind,
    /** dotted/indexed path into the request body */
    pub path: String,
    /** human readable detail, safe to return to the client */
    pub detail: String,
}

///
/// Application error types.
///
/// `UnsupportedFormat` and `ToolSchemaRejected` never reach the client on their
/// own: the strategy selector consumes them and falls back to prompt-based tool
/// calling.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unsupported tool format for {family}: {reason}")]
    UnsupportedFormat { family: ModelFamily, reason: String },

    #[error("Upstream rejected tool schema: {0}")]
    ToolSchemaRejected(String),

    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
}

/* --- start of code -------------------------------------------------------------------------- */

/// Result type alias for cleaner error handling throughout the application
pub type Result<T> = std::result::Result<T, BridgeError>;

impl ValidationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationErrorKind::EmptyToolName => "empty_tool_name",
            ValidationErrorKind::InvalidToolName => "invalid_tool_name",
            ValidationErrorKind::DuplicateToolName => "duplicate_tool_name",
            ValidationErrorKind::InvalidToolType => "invalid_tool_type",
            ValidationErrorKind::InvalidParameters => "invalid_parameters",
            ValidationErrorKind::UnknownToolChoice => "unknown_tool_choice",
            ValidationErrorKind::InvalidToolChoice => "invalid_tool_choice",
            ValidationErrorKind::MissingField => "missing_field",
            ValidationErrorKind::UnsupportedContent => "unsupported_content",
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self { kind, path: path.into(), detail: detail.into() }
    }
}

impl BridgeError {
    ///
    /// Whether the strategy selector may answer this error with a single
    /// prompt-based retry.
    pub fn is_fallback_trigger(&self) -> bool {
        matches!(self, BridgeError::UnsupportedFormat { .. } | BridgeError::ToolSchemaRejected(_))
    }

    ///
    /// HTTP status the error is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            BridgeError::Validation(_) | BridgeError::UnknownModel(_) => 400,
            BridgeError::ToolSchemaRejected(_) => 400,
            BridgeError::Upstream { status, .. } => *status,
            BridgeError::Request(e) if e.is_timeout() => 504,
            BridgeError::Request(_) => 502,
            BridgeError::UnsupportedFormat { .. }
            | BridgeError::Config(_)
            | BridgeError::Http(_)
            | BridgeError::Serialization(_) => 500,
        }
    }

    ///
    /// OpenAI-style error `type` field.
    pub fn error_type(&self) -> &'static str {
        match self {
            BridgeError::Validation(_)
            | BridgeError::UnknownModel(_)
            | BridgeError::ToolSchemaRejected(_) => "invalid_request_error",
            BridgeError::Upstream { status: 429, .. } => "rate_limit_error",
            BridgeError::Upstream { .. } | BridgeError::Request(_) => "upstream_error",
            _ => "internal_error",
        }
    }

    ///
    /// Offending request parameter, when known.
    pub fn param(&self) -> Option<&str> {
        match self {
            BridgeError::Validation(v) => Some(v.path.as_str()),
            BridgeError::UnknownModel(_) => Some("model"),
            _ => None,
        }
    }

    ///
    /// Client-facing message. Never contains upstream URLs, credentials or raw
    /// response bodies.
    pub fn public_message(&self) -> String {
        match self {
            BridgeError::Validation(v) => v.to_string(),
            BridgeError::UnknownModel(m) => format!("Model '{}' is not available", m),
            BridgeError::Upstream { message, .. } => message.clone(),
            BridgeError::ToolSchemaRejected(_) => {
                "The upstream model rejected the tool definitions".to_string()
            }
            BridgeError::Request(e) if e.is_timeout() => "Upstream request timed out".to_string(),
            BridgeError::Request(_) => "Failed to reach upstream model service".to_string(),
            BridgeError::UnsupportedFormat { .. } => {
                "Tool definitions could not be translated for this model".to_string()
            }
            BridgeError::Config(_) | BridgeError::Http(_) | BridgeError::Serialization(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

/* --- tests ----------------------------------------------------------------------------------- */
