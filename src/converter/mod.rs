//!
//! Format conversion between canonical tools and provider wire formats.
//!
//! `encode` turns canonical tools and tool choice into a provider's native
//! payload; `decode` recovers canonical tool calls from a provider's native
//! response. Both are exhaustive over [`ModelFamily`]: families without native
//! tool support fail `encode` with `UnsupportedFormat`, which the strategy
//! selector answers by switching to prompt-based tool calling.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- modules --------------------------------------------------------------------------------- */

pub mod anthropic;
pub mod google;
pub mod messages;
pub mod openai;

/* --- uses ------------------------------------------------------------------------------------ */

use serde_json::{Map, Value};

use crate::config::LogLevel;
use crate::error::{BridgeError, Result};
use crate::tools::{CallIdGenerator, ModelFamily, Tool, ToolCall, ToolChoice};

pub use anthropic::{AnthropicTool, AnthropicToolChoice, AnthropicToolUse};
pub use google::GoogleFunctionCall;
pub use openai::{OpenAiTool, OpenAiToolCall, OpenAiToolChoice};

/* --- constants ------------------------------------------------------------------------------- */

/// Top-level schema combinators Anthropic refuses in `input_schema`.
const ANTHROPIC_REJECTED_COMBINATORS: [&str; 3] = ["oneOf", "anyOf", "allOf"];

/* --- types ----------------------------------------------------------------------------------- */

///
/// Native tool section for one provider, ready to be merged into a request body.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderToolPayload {
    OpenAi { tools: Vec<OpenAiTool>, tool_choice: OpenAiToolChoice },
    Anthropic { tools: Vec<AnthropicTool>, tool_choice: AnthropicToolChoice },
}

///
/// Stateless converter between canonical tool types and provider formats.
#[derive(Debug, Clone)]
pub struct FormatConverter {
    /** logging level for debug output */
    log_level: LogLevel,
}

/* --- start of code -------------------------------------------------------------------------- */

impl ProviderToolPayload {
    pub fn family(&self) -> ModelFamily {
        match self {
            ProviderToolPayload::OpenAi { .. } => ModelFamily::OpenAI,
            ProviderToolPayload::Anthropic { .. } => ModelFamily::Anthropic,
        }
    }

    /// Tool definitions read back in canonical form.
    pub fn tools(&self) -> Vec<Tool> {
        match self {
            ProviderToolPayload::OpenAi { tools, .. } => tools.iter().map(OpenAiTool::to_tool).collect(),
            ProviderToolPayload::Anthropic { tools, .. } => {
                tools.iter().map(AnthropicTool::to_tool).collect()
            }
        }
    }

    ///
    /// Writes `tools` and `tool_choice` into an outbound request body.
    ///
    /// # Arguments
    ///  * `body` - request object to extend
    ///
    /// # Returns
    ///  * error only if serialization fails
    pub fn apply_to(&self, body: &mut Map<String, Value>) -> Result<()> {
        let (tools, choice) = match self {
            ProviderToolPayload::OpenAi { tools, tool_choice } => {
                (serde_json::to_value(tools)?, serde_json::to_value(tool_choice)?)
            }
            ProviderToolPayload::Anthropic { tools, tool_choice } => {
                (serde_json::to_value(tools)?, serde_json::to_value(tool_choice)?)
            }
        };
        body.insert("tools".to_string(), tools);
        body.insert("tool_choice".to_string(), choice);
        Ok(())
    }
}

impl FormatConverter {
    ///
    /// Create a new converter.
    ///
    /// # Arguments
    ///  * `log_level` - logging level for debug output
    pub fn new(log_level: LogLevel) -> Self {
        Self { log_level }
    }

    ///
    /// Encodes canonical tools and tool choice into a provider's native format.
    ///
    /// # Arguments
    ///  * `tools` - validated tool definitions, in request order
    ///  * `choice` - validated tool choice
    ///  * `family` - target provider family
    ///
    /// # Returns
    ///  * native payload, or `UnsupportedFormat` when the family (or a schema
    ///    feature) has no native representation
    pub fn encode(
        &self,
        tools: &[Tool],
        choice: &ToolChoice,
        family: ModelFamily,
    ) -> Result<ProviderToolPayload> {
        let payload = match family {
            ModelFamily::OpenAI => ProviderToolPayload::OpenAi {
                tools: tools.iter().map(OpenAiTool::from).collect(),
                tool_choice: OpenAiToolChoice::from(choice),
            },
            ModelFamily::Anthropic => {
                for tool in tools {
                    check_anthropic_schema(tool)?;
                }
                ProviderToolPayload::Anthropic {
                    tools: tools.iter().map(AnthropicTool::from).collect(),
                    tool_choice: AnthropicToolChoice::from(choice),
                }
            }
            ModelFamily::Google | ModelFamily::Unknown => {
                return Err(BridgeError::UnsupportedFormat {
                    family,
                    reason: "no native tool definitions for this model family".to_string(),
                });
            }
        };
        self.debug(&format!("Encoded {} tools natively for {}", tools.len(), family));
        Ok(payload)
    }

    ///
    /// Decodes a provider's native tool-call payload into canonical calls.
    ///
    /// Accepts the calls array itself, an object carrying `tool_calls`, an
    /// object wrapped in `response`, an OpenAI `choices` envelope, an
    /// Anthropic content-block list or a single Gemini `{name, args}` object.
    /// Entries that cannot be decoded are dropped with a warning.
    ///
    /// # Arguments
    ///  * `payload` - structured upstream output
    ///  * `family` - family that produced it
    ///  * `ids` - id source for calls without an upstream id
    ///
    /// # Returns
    ///  * calls in provider order; empty when none are present
    pub fn decode(&self, payload: &Value, family: ModelFamily, ids: &CallIdGenerator) -> Vec<ToolCall> {
        let Some(located) = locate_calls(payload, family) else {
            return Vec::new();
        };

        let entries: Vec<&Value> = match located {
            Value::Array(items) => items.iter().collect(),
            single @ Value::Object(_) => vec![single],
            _ => Vec::new(),
        };

        let mut calls = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            if is_non_call_block(entry) {
                continue;
            }
            match decode_entry(entry, family, ids, calls.len()) {
                Ok(call) => calls.push(call),
                Err(reason) => {
                    tracing::warn!(
                        "Failed to decode {} tool call at index {}: {}",
                        family,
                        index,
                        reason
                    );
                }
            }
        }
        self.debug(&format!("Decoded {} native tool calls from {}", calls.len(), family));
        calls
    }

    /// Log debug message if trace logging is enabled
    pub(crate) fn debug(&self, msg: &str) {
        if self.log_level.is_trace_enabled() {
            tracing::debug!("[TRACE] {}", msg);
        }
    }
}

impl Default for FormatConverter {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

fn check_anthropic_schema(tool: &Tool) -> Result<()> {
    if let Some(schema) = tool.parameters.as_object() {
        for key in ANTHROPIC_REJECTED_COMBINATORS {
            if schema.contains_key(key) {
                return Err(BridgeError::UnsupportedFormat {
                    family: ModelFamily::Anthropic,
                    reason: format!("tool '{}' uses top-level '{}' in its schema", tool.name, key),
                });
            }
        }
    }
    Ok(())
}

fn locate_calls(payload: &Value, family: ModelFamily) -> Option<&Value> {
    match payload {
        Value::Array(_) => Some(payload),
        Value::Object(map) => {
            if let Some(calls) = map.get("tool_calls") {
                return (!calls.is_null()).then_some(calls);
            }
            if let Some(inner) = map.get("response") {
                return locate_calls(inner, family);
            }
            if let Some(message) = map
                .get("choices")
                .and_then(|c| c.get(0))
                .and_then(|c| c.get("message"))
            {
                return locate_calls(message, family);
            }
            if let Some(blocks @ Value::Array(_)) = map.get("content") {
                return Some(blocks);
            }
            if map.contains_key("name") && !map.contains_key("role") {
                return Some(payload);
            }
            None
        }
        _ => None,
    }
}

/// Content blocks that sit next to tool uses but are not calls themselves.
fn is_non_call_block(entry: &Value) -> bool {
    matches!(
        entry.get("type").and_then(Value::as_str),
        Some("text") | Some("thinking") | Some("image")
    )
}

fn decode_entry(
    entry: &Value,
    family: ModelFamily,
    ids: &CallIdGenerator,
    ordinal: usize,
) -> std::result::Result<ToolCall, String> {
    if !entry.is_object() {
        return Err(format!("expected an object, got {}", json_kind(entry)));
    }

    let (id, name, arguments) = match family {
        ModelFamily::OpenAI => decode_openai(entry)?,
        ModelFamily::Anthropic => decode_anthropic(entry)?,
        ModelFamily::Google => decode_google(entry)?,
        ModelFamily::Unknown => decode_openai(entry)
            .or_else(|_| decode_anthropic(entry))
            .or_else(|_| decode_google(entry))?,
    };

    if name.is_empty() {
        return Err("tool call has an empty name".to_string());
    }
    let id = id.filter(|id| !id.is_empty()).unwrap_or_else(|| ids.id_for(ordinal));
    ToolCall::from_arguments_value(id, name, &arguments)
}

type DecodedParts = (Option<String>, String, Value);

fn decode_openai(entry: &Value) -> std::result::Result<DecodedParts, String> {
    let function = entry.get("function").ok_or("missing 'function' object")?;
    let name = function
        .get("name")
        .and_then(Value::as_str)
        .ok_or("missing 'function.name'")?;
    let id = entry.get("id").and_then(Value::as_str).map(str::to_string);
    let arguments = function.get("arguments").cloned().unwrap_or(Value::Null);
    Ok((id, name.to_string(), arguments))
}

fn decode_anthropic(entry: &Value) -> std::result::Result<DecodedParts, String> {
    if let Some(kind) = entry.get("type").and_then(Value::as_str) {
        if kind != "tool_use" {
            return Err(format!("unexpected block type '{}'", kind));
        }
    }
    let block: AnthropicToolUse =
        serde_json::from_value(entry.clone()).map_err(|e| format!("invalid tool_use block: {}", e))?;
    Ok((block.id, block.name, block.input))
}

fn decode_google(entry: &Value) -> std::result::Result<DecodedParts, String> {
    let call: GoogleFunctionCall =
        serde_json::from_value(entry.clone()).map_err(|e| format!("invalid function call: {}", e))?;
    Ok((call.id, call.name, call.args))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/* --- tests ----------------------------------------------------------------------------------- */
