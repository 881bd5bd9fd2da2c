//!
//! Anthropic tool-use wire types.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::{Tool, ToolChoice};

/* --- types ----------------------------------------------------------------------------------- */

///
/// Anthropic tool definition for function calling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnthropicTool {
    /** function name */
    pub name: String,
    /** function description */
    #[serde(default)]
    pub description: String,
    /** JSON schema for function input */
    #[serde(rename = "input_schema")]
    pub input_schema: Value,
}

///
/// Anthropic tool choice configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AnthropicToolChoice {
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "none")]
    None,
    /** model must use some tool */
    #[serde(rename = "any")]
    Any,
    /** model must use the named tool */
    #[serde(rename = "tool")]
    Tool { name: String },
}

///
/// `tool_use` content block returned by Anthropic models.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnthropicToolUse {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub input: Value,
}

/* --- start of code -------------------------------------------------------------------------- */

impl From<&Tool> for AnthropicTool {
    fn from(tool: &Tool) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: tool.parameters.clone(),
        }
    }
}

impl From<&ToolChoice> for AnthropicToolChoice {
    fn from(choice: &ToolChoice) -> Self {
        match choice {
            ToolChoice::Auto => AnthropicToolChoice::Auto,
            ToolChoice::None => AnthropicToolChoice::None,
            ToolChoice::Required => AnthropicToolChoice::Any,
            ToolChoice::Named(name) => AnthropicToolChoice::Tool { name: name.clone() },
        }
    }
}

impl AnthropicTool {
    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.input_schema.clone(),
        }
    }
}

/* --- tests ----------------------------------------------------------------------------------- */
