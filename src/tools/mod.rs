//!
//! Canonical tool-calling model.
//!
//! Provider-neutral representation of tools, tool choices, tool calls and the
//! translated result of one upstream response. Every other part of the bridge
//! converts into or out of these types; none of them know about a particular
//! provider's wire shape.
//!
//! - `schema.rs` - parsing and validation of the caller's `tools`/`tool_choice`
//! - `prompt.rs` - textual tool instructions for models without native support
//! - `strategy.rs` - native vs. prompt-based selection with a single fallback
//! - `interceptor.rs` - extraction of tool calls from upstream output
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- modules --------------------------------------------------------------------------------- */

pub mod interceptor;
pub mod prompt;
pub mod schema;
pub mod strategy;

/* --- uses ------------------------------------------------------------------------------------ */

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/* --- types ----------------------------------------------------------------------------------- */

///
/// A callable function offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /** unique within a request, `^[A-Za-z0-9_-]+$` */
    pub name: String,
    /** free text, may be empty */
    pub description: String,
    /** JSON-Schema object with top-level `"type": "object"` */
    pub parameters: Value,
}

///
/// Caller's directive on whether and which tool the model must call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ToolChoice {
    #[default]
    Auto,
    None,
    Required,
    Named(String),
}

///
/// A tool invocation requested by the model.
///
/// `arguments` is JSON text that has been checked to parse. It is never
/// re-serialized once accepted, so key order and formatting survive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

///
/// Upstream provider family, derived once per request from the resolved model id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    #[serde(rename = "openai")]
    OpenAI,
    Anthropic,
    Google,
    Unknown,
}

///
/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    ContentFilter,
}

///
/// Normalized outcome of one upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationResult {
    /** residual text outside any tool-call block */
    pub content: String,
    /** tool calls in the order the model produced them */
    pub calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
}

///
/// Validated tool section of one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRequest {
    pub tools: Vec<Tool>,
    pub choice: ToolChoice,
    /** caller asked for prompt-embedded tools on this request */
    pub force_prompt_mode: bool,
}

///
/// Deterministic id source for calls whose upstream did not supply one.
///
/// Ids take the form `call_<seed>_<ordinal>`; a fixed seed makes extraction a
/// pure function of its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallIdGenerator {
    seed: String,
}

/* --- start of code -------------------------------------------------------------------------- */

impl Tool {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self { name: name.into(), description: description.into(), parameters }
    }
}

impl ToolCall {
    ///
    /// Builds a call from an arguments value as found in an upstream payload.
    ///
    /// # Arguments
    ///  * `id` - call id
    ///  * `name` - tool name
    ///  * `arguments` - JSON string (kept verbatim if it parses) or any JSON value (serialized once)
    ///
    /// # Returns
    ///  * the call, or a description of why the arguments are unusable
    pub fn from_arguments_value(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: &Value,
    ) -> std::result::Result<Self, String> {
        let arguments = arguments_text(arguments)?;
        Ok(Self { id: id.into(), name: name.into(), arguments })
    }
}

///
/// Normalizes a tool-call arguments value into validated JSON text.
///
/// # Arguments
///  * `value` - JSON-encoded string, object, or absent (`null`)
///
/// # Returns
///  * the JSON text; `{}` for null or blank strings
pub fn arguments_text(value: &Value) -> std::result::Result<String, String> {
    match value {
        Value::Null => Ok("{}".to_string()),
        Value::String(text) if text.trim().is_empty() => Ok("{}".to_string()),
        Value::String(text) => serde_json::from_str::<Value>(text)
            .map(|_| text.clone())
            .map_err(|e| format!("arguments are not valid JSON: {}", e)),
        other => serde_json::to_string(other).map_err(|e| e.to_string()),
    }
}

impl ModelFamily {
    ///
    /// Classifies an upstream model identifier.
    ///
    /// `gpt*` and `o<digit>*` are OpenAI, `claude*` Anthropic, `gemini*` Google.
    pub fn from_model_id(model_id: &str) -> Self {
        let id = model_id.trim().to_ascii_lowercase();
        let mut chars = id.chars();
        let o_series = chars.next() == Some('o') && chars.next().is_some_and(|c| c.is_ascii_digit());
        if id.starts_with("gpt") || o_series {
            ModelFamily::OpenAI
        } else if id.starts_with("claude") {
            ModelFamily::Anthropic
        } else if id.starts_with("gemini") {
            ModelFamily::Google
        } else {
            ModelFamily::Unknown
        }
    }

    /// Families the bridge can talk to with native tool payloads.
    pub fn supports_native_tools(&self) -> bool {
        matches!(self, ModelFamily::OpenAI | ModelFamily::Anthropic)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::OpenAI => "openai",
            ModelFamily::Anthropic => "anthropic",
            ModelFamily::Google => "google",
            ModelFamily::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::ToolCalls => "tool_calls",
            FinishReason::Length => "length",
            FinishReason::ContentFilter => "content_filter",
        }
    }

    ///
    /// Maps a provider's stop signal onto the client vocabulary.
    ///
    /// # Returns
    ///  * `None` for signals the bridge does not recognise
    pub fn from_provider_signal(signal: &str) -> Option<Self> {
        match signal.to_ascii_lowercase().as_str() {
            "stop" | "end_turn" | "stop_sequence" | "finish_reason_stop" => Some(FinishReason::Stop),
            "tool_calls" | "tool_use" | "function_call" => Some(FinishReason::ToolCalls),
            "length" | "max_tokens" => Some(FinishReason::Length),
            "content_filter" | "refusal" | "safety" => Some(FinishReason::ContentFilter),
            _ => None,
        }
    }
}

impl TranslationResult {
    /// Plain text answer with no tool calls.
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: content.into(), calls: Vec::new(), finish_reason: FinishReason::Stop }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.calls.is_empty()
    }
}

impl ToolRequest {
    pub fn tool(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name == name)
    }
}

impl CallIdGenerator {
    pub fn new(seed: impl Into<String>) -> Self {
        Self { seed: seed.into() }
    }

    /// Generator with a fresh random seed, for production requests.
    pub fn random() -> Self {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        Self { seed: uuid[..12].to_string() }
    }

    pub fn id_for(&self, ordinal: usize) -> String {
        format!("call_{}_{}", self.seed, ordinal)
    }
}

impl Default for CallIdGenerator {
    fn default() -> Self {
        Self::random()
    }
}

/* --- tests ----------------------------------------------------------------------------------- */
