//!
//! OpenAI function-calling wire types.
//!
//! The client-facing protocol of the bridge and the native tool format of
//! OpenAI-family upstreams. Used for parsing inbound `tools`/`tool_choice`,
//! encoding outbound native payloads and decoding returned `tool_calls`.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::{Tool, ToolCall, ToolChoice};

/* --- types ----------------------------------------------------------------------------------- */

///
/// OpenAI tool definition for available functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiTool {
    /** tool type, always "function" */
    #[serde(rename = "type", default = "function_type")]
    pub tool_type: String,
    /** function definition and schema */
    pub function: OpenAiToolFunction,
}

///
/// OpenAI function definition within a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiToolFunction {
    /** function name */
    pub name: String,
    /** function description */
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /** JSON schema for function parameters */
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

///
/// OpenAI tool choice configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpenAiToolChoice {
    /** string choice: "auto", "none", "required" */
    String(String),
    /** object choice forcing a specific function */
    Object(OpenAiToolChoiceObject),
}

///
/// OpenAI tool choice object for specific function selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiToolChoiceObject {
    /** choice type, "function" */
    #[serde(rename = "type")]
    pub choice_type: String,
    /** specific function to choose */
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<OpenAiToolChoiceFunction>,
}

///
/// OpenAI specific function choice within tool choice object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiToolChoiceFunction {
    /** function name to force */
    pub name: String,
}

///
/// OpenAI tool call as returned in `message.tool_calls`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiToolCall {
    /** unique identifier for this tool call */
    pub id: String,
    /** tool call type, "function" */
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    /** function call details */
    pub function: OpenAiFunctionCall,
}

///
/// Function name and JSON-encoded arguments of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiFunctionCall {
    pub name: String,
    pub arguments: String,
}

/* --- start of code -------------------------------------------------------------------------- */

fn function_type() -> String {
    "function".to_string()
}

impl From<&Tool> for OpenAiTool {
    fn from(tool: &Tool) -> Self {
        Self {
            tool_type: function_type(),
            function: OpenAiToolFunction {
                name: tool.name.clone(),
                description: Some(tool.description.clone()),
                parameters: Some(tool.parameters.clone()),
            },
        }
    }
}

impl From<&ToolChoice> for OpenAiToolChoice {
    fn from(choice: &ToolChoice) -> Self {
        match choice {
            ToolChoice::Auto => OpenAiToolChoice::String("auto".to_string()),
            ToolChoice::None => OpenAiToolChoice::String("none".to_string()),
            ToolChoice::Required => OpenAiToolChoice::String("required".to_string()),
            ToolChoice::Named(name) => OpenAiToolChoice::Object(OpenAiToolChoiceObject {
                choice_type: function_type(),
                function: Some(OpenAiToolChoiceFunction { name: name.clone() }),
            }),
        }
    }
}

impl From<&ToolCall> for OpenAiToolCall {
    fn from(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            call_type: function_type(),
            function: OpenAiFunctionCall {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            },
        }
    }
}

impl OpenAiTool {
    /// Canonical view; absent description/parameters take their defaults.
    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.function.name.clone(),
            description: self.function.description.clone().unwrap_or_default(),
            parameters: self
                .function
                .parameters
                .clone()
                .unwrap_or_else(|| serde_json::json!({"type": "object", "properties": {}})),
        }
    }
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_named_choice_wire_shape() {
        let choice = OpenAiToolChoice::from(&ToolChoice::Named("get_weather".into()));
        assert_eq!(
            serde_json::to_value(choice).unwrap(),
            json!({"type": "function", "function": {"name": "get_weather"}})
        );
    }

    #[test]
    fn test_string_choices() {
        assert_eq!(serde_json::to_value(OpenAiToolChoice::from(&ToolChoice::Required)).unwrap(), json!("required"));
        assert_eq!(serde_json::to_value(OpenAiToolChoice::from(&ToolChoice::None)).unwrap(), json!("none"));
    }

    #[test]
    fn test_tool_without_parameters_defaults_to_empty_object_schema() {
        let tool: OpenAiTool =
            serde_json::from_value(json!({"type": "function", "function": {"name": "ping"}})).unwrap();
        let canonical = tool.to_tool();
        assert_eq!(canonical.description, "");
        assert_eq!(canonical.parameters, json!({"type": "object", "properties": {}}));
    }
}
