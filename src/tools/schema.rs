//!
//! Parsing and validation of the caller's tool section.
//!
//! Turns the OpenAI-shaped `tools` and `tool_choice` fields of a request body
//! into a validated [`ToolRequest`]. Every rejection names the offending field
//! path; nothing invalid is ever forwarded upstream.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::collections::HashSet;

use serde_json::Value;

use super::{Tool, ToolChoice, ToolRequest};
use crate::converter::openai::{OpenAiTool, OpenAiToolChoice};
use crate::error::{ValidationError, ValidationErrorKind};

/* --- start of code -------------------------------------------------------------------------- */

///
/// Parses and validates `tools` and `tool_choice`.
///
/// # Arguments
///  * `tools` - raw `tools` field, if present
///  * `tool_choice` - raw `tool_choice` field, if present
///
/// # Returns
///  * `Ok(None)` when the request carries no tools (a choice of `auto`/`none`
///    is then ignored), `Ok(Some(..))` for a valid tool section
pub fn parse_tool_request(
    tools: Option<&Value>,
    tool_choice: Option<&Value>,
) -> Result<Option<ToolRequest>, ValidationError> {
    let tools = match tools {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_tool(item, &format!("tools[{}]", i)))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(ValidationError::new(
                ValidationErrorKind::InvalidToolType,
                "tools",
                "tools must be an array",
            ));
        }
    };
    validate_tools(&tools)?;

    let choice = match tool_choice {
        None | Some(Value::Null) => ToolChoice::Auto,
        Some(raw) => parse_tool_choice(raw)?,
    };

    if tools.is_empty() {
        return match choice {
            ToolChoice::Auto | ToolChoice::None => Ok(None),
            _ => Err(ValidationError::new(
                ValidationErrorKind::InvalidToolChoice,
                "tool_choice",
                "tool_choice requires at least one tool",
            )),
        };
    }

    validate_choice(&choice, &tools)?;
    Ok(Some(ToolRequest { tools, choice, force_prompt_mode: false }))
}

fn parse_tool(item: &Value, path: &str) -> Result<Tool, ValidationError> {
    let Some(obj) = item.as_object() else {
        return Err(ValidationError::new(
            ValidationErrorKind::InvalidToolType,
            path,
            "tool must be an object",
        ));
    };
    match obj.get("type").and_then(Value::as_str) {
        Some("function") | None => {}
        Some(other) => {
            return Err(ValidationError::new(
                ValidationErrorKind::InvalidToolType,
                format!("{}.type", path),
                format!("unsupported tool type '{}', expected 'function'", other),
            ));
        }
    }
    if !obj.get("function").is_some_and(Value::is_object) {
        return Err(ValidationError::new(
            ValidationErrorKind::MissingField,
            format!("{}.function", path),
            "tool is missing its 'function' object",
        ));
    }
    if !obj["function"].get("name").is_some_and(Value::is_string) {
        return Err(ValidationError::new(
            ValidationErrorKind::MissingField,
            format!("{}.function.name", path),
            "function name is required",
        ));
    }

    let wire: OpenAiTool = serde_json::from_value(item.clone()).map_err(|e| {
        ValidationError::new(ValidationErrorKind::InvalidToolType, path, e.to_string())
    })?;
    let tool = wire.to_tool();
    validate_tool(&tool, path)?;
    Ok(tool)
}

///
/// Checks a set of tools: each name and schema, and name uniqueness.
pub fn validate_tools(tools: &[Tool]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for (i, tool) in tools.iter().enumerate() {
        let path = format!("tools[{}]", i);
        validate_tool(tool, &path)?;
        if !seen.insert(tool.name.as_str()) {
            return Err(ValidationError::new(
                ValidationErrorKind::DuplicateToolName,
                format!("{}.function.name", path),
                format!("tool name '{}' is declared more than once", tool.name),
            ));
        }
    }
    Ok(())
}

fn validate_tool(tool: &Tool, path: &str) -> Result<(), ValidationError> {
    let name_path = format!("{}.function.name", path);
    if tool.name.is_empty() {
        return Err(ValidationError::new(
            ValidationErrorKind::EmptyToolName,
            name_path,
            "tool name must not be empty",
        ));
    }
    if !is_valid_tool_name(&tool.name) {
        return Err(ValidationError::new(
            ValidationErrorKind::InvalidToolName,
            name_path,
            format!("tool name '{}' must match ^[A-Za-z0-9_-]+$", tool.name),
        ));
    }

    let params_path = format!("{}.function.parameters", path);
    let Some(schema) = tool.parameters.as_object() else {
        return Err(ValidationError::new(
            ValidationErrorKind::InvalidParameters,
            params_path,
            "parameters must be a JSON schema object",
        ));
    };
    if schema.get("type").and_then(Value::as_str) != Some("object") {
        return Err(ValidationError::new(
            ValidationErrorKind::InvalidParameters,
            format!("{}.type", params_path),
            "parameters schema must have top-level \"type\": \"object\"",
        ));
    }
    if let Some(props) = schema.get("properties") {
        if !props.is_object() {
            return Err(ValidationError::new(
                ValidationErrorKind::InvalidParameters,
                format!("{}.properties", params_path),
                "properties must be an object",
            ));
        }
    }
    Ok(())
}

/// `^[A-Za-z0-9_-]+$`
pub fn is_valid_tool_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn parse_tool_choice(raw: &Value) -> Result<ToolChoice, ValidationError> {
    let invalid = |detail: String| {
        ValidationError::new(ValidationErrorKind::InvalidToolChoice, "tool_choice", detail)
    };
    let wire: OpenAiToolChoice = serde_json::from_value(raw.clone())
        .map_err(|_| invalid("tool_choice must be a string or a function object".to_string()))?;

    match wire {
        OpenAiToolChoice::String(mode) => match mode.as_str() {
            "auto" => Ok(ToolChoice::Auto),
            "none" => Ok(ToolChoice::None),
            "required" | "any" => Ok(ToolChoice::Required),
            other => Err(invalid(format!(
                "unknown tool_choice '{}', expected auto, none or required",
                other
            ))),
        },
        OpenAiToolChoice::Object(obj) => {
            if obj.choice_type != "function" {
                return Err(ValidationError::new(
                    ValidationErrorKind::InvalidToolChoice,
                    "tool_choice.type",
                    format!("unsupported tool_choice type '{}'", obj.choice_type),
                ));
            }
            match obj.function {
                Some(f) => Ok(ToolChoice::Named(f.name)),
                None => Err(ValidationError::new(
                    ValidationErrorKind::MissingField,
                    "tool_choice.function.name",
                    "named tool_choice requires function.name",
                )),
            }
        }
    }
}

///
/// A named choice must refer to one of the declared tools.
pub fn validate_choice(choice: &ToolChoice, tools: &[Tool]) -> Result<(), ValidationError> {
    if let ToolChoice::Named(name) = choice {
        if !tools.iter().any(|t| &t.name == name) {
            return Err(ValidationError::new(
                ValidationErrorKind::UnknownToolChoice,
                "tool_choice.function.name",
                format!("tool_choice names '{}', which is not among the declared tools", name),
            ));
        }
    }
    Ok(())
}

/* --- tests ----------------------------------------------------------------------------------- */
