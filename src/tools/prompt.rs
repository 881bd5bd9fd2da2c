//!
//! Prompt-based tool calling.
//!
//! For upstreams without native function calling the tool definitions are
//! rendered into a system message that tells the model how to request a call:
//! one `<tool_call>{"name": ..., "arguments": {...}}</tool_call>` block per
//! call. The interceptor recognises the same delimiters on the way back.
//!
//! Templates are keyed by model family, built once and never mutated. The same
//! tools, choice, family and [`TEMPLATE_VERSION`] always render byte-identical
//! text.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::sync::LazyLock;

use serde_json::{Value, json};

use super::{ModelFamily, Tool, ToolChoice};
use crate::converter::messages::content_text;

/* --- constants ------------------------------------------------------------------------------- */

/// Bumped whenever rendered prompt text changes.
pub const TEMPLATE_VERSION: u32 = 2;

pub const TOOL_CALL_OPEN: &str = "<tool_call>";
pub const TOOL_CALL_CLOSE: &str = "</tool_call>";

static TEMPLATES: LazyLock<PromptTemplates> = LazyLock::new(PromptTemplates::builtin);

/* --- types ----------------------------------------------------------------------------------- */

///
/// Family-specific wording around the shared tool listing.
#[derive(Debug, Clone)]
struct FamilyTemplate {
    /** opening paragraph */
    preamble: &'static str,
    /** heading placed above each tool */
    tool_heading: &'static str,
}

///
/// The full template set, one entry per family.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    openai: FamilyTemplate,
    anthropic: FamilyTemplate,
    google: FamilyTemplate,
    generic: FamilyTemplate,
}

/* --- start of code -------------------------------------------------------------------------- */

impl PromptTemplates {
    fn builtin() -> Self {
        Self {
            openai: FamilyTemplate {
                preamble: "# Tools\n\nYou may call one or more functions to assist with the user query. \
                           The available functions are described below.",
                tool_heading: "## Function",
            },
            anthropic: FamilyTemplate {
                preamble: "In this environment you have access to a set of tools you can use to \
                           answer the user's question. The tools are described below.",
                tool_heading: "Tool",
            },
            google: FamilyTemplate {
                preamble: "You can request external functions to be called on your behalf. \
                           The functions you may request are listed below.",
                tool_heading: "Function",
            },
            generic: FamilyTemplate {
                preamble: "You have access to the following tools. Use them when they help \
                           answer the request.",
                tool_heading: "Tool",
            },
        }
    }

    fn for_family(&self, family: ModelFamily) -> &FamilyTemplate {
        match family {
            ModelFamily::OpenAI => &self.openai,
            ModelFamily::Anthropic => &self.anthropic,
            ModelFamily::Google => &self.google,
            ModelFamily::Unknown => &self.generic,
        }
    }

    ///
    /// Renders the tool instruction block.
    ///
    /// # Arguments
    ///  * `tools` - validated tools in request order
    ///  * `choice` - validated tool choice
    ///  * `family` - target family, selects the template
    ///
    /// # Returns
    ///  * the system message text
    pub fn render(&self, tools: &[Tool], choice: &ToolChoice, family: ModelFamily) -> String {
        let template = self.for_family(family);
        let mut out = String::new();
        out.push_str(template.preamble);
        out.push_str("\n\n");

        for tool in tools {
            out.push_str(&format!("{}: {}\n", template.tool_heading, tool.name));
            if !tool.description.is_empty() {
                out.push_str(&format!("Description: {}\n", tool.description));
            }
            let schema = serde_json::to_string_pretty(&tool.parameters)
                .unwrap_or_else(|_| tool.parameters.to_string());
            out.push_str(&format!("Parameters (JSON Schema):\n{}\n\n", schema));
        }

        out.push_str(&choice_instruction(choice));
        out.push_str("\n\n");
        out.push_str(&format!(
            "To call a tool, reply with one block per call, exactly in this form:\n\
             {open}{{\"name\": \"<tool name>\", \"arguments\": {{<arguments as a JSON object>}}}}{close}\n\
             Emit several blocks to call several tools. The content of each block must be valid JSON. \
             Do not wrap the blocks in code fences. Any text outside the blocks is shown to the user.",
            open = TOOL_CALL_OPEN,
            close = TOOL_CALL_CLOSE
        ));
        out
    }
}

fn choice_instruction(choice: &ToolChoice) -> String {
    match choice {
        ToolChoice::Auto => {
            "Decide for yourself whether a tool call is needed; answer directly when it is not."
                .to_string()
        }
        ToolChoice::None => "Do not call any tool in this reply. Answer with text only.".to_string(),
        ToolChoice::Required => "You must call at least one tool in this reply.".to_string(),
        ToolChoice::Named(name) => format!("You must call the tool '{}' in this reply.", name),
    }
}

///
/// Renders the tool instruction block with the process-wide templates.
pub fn render_tool_prompt(tools: &[Tool], choice: &ToolChoice, family: ModelFamily) -> String {
    TEMPLATES.render(tools, choice, family)
}

///
/// Returns a copy of `messages` with the tool prompt as a new leading system
/// message. The caller's messages are not modified.
pub fn with_tool_prompt(messages: &[Value], prompt: &str) -> Vec<Value> {
    let mut out = Vec::with_capacity(messages.len() + 1);
    out.push(json!({"role": "system", "content": prompt}));
    out.extend(messages.iter().cloned());
    out
}

///
/// Rewrites tool-calling history into plain text for upstreams that only see
/// the prompt convention.
///
/// Assistant `tool_calls` become `<tool_call>` blocks appended to the assistant
/// text; `tool` messages become user messages carrying the result.
pub fn flatten_tool_history(messages: &[Value]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            let role = message.get("role").and_then(Value::as_str).unwrap_or("");
            match role {
                "assistant" if message.get("tool_calls").is_some_and(Value::is_array) => {
                    let mut text = message.get("content").map(content_text).unwrap_or_default();
                    for call in message["tool_calls"].as_array().into_iter().flatten() {
                        let name = call["function"]["name"].as_str().unwrap_or_default();
                        let arguments = match &call["function"]["arguments"] {
                            Value::String(s) => s.clone(),
                            Value::Null => "{}".to_string(),
                            other => other.to_string(),
                        };
                        if !text.is_empty() {
                            text.push('\n');
                        }
                        text.push_str(&format!(
                            "{}{{\"name\": {}, \"arguments\": {}}}{}",
                            TOOL_CALL_OPEN,
                            Value::String(name.to_string()),
                            arguments,
                            TOOL_CALL_CLOSE
                        ));
                    }
                    json!({"role": "assistant", "content": text})
                }
                "tool" => {
                    let id = message.get("tool_call_id").and_then(Value::as_str).unwrap_or("unknown");
                    let result = message.get("content").map(content_text).unwrap_or_default();
                    json!({"role": "user", "content": format!("Tool result ({}): {}", id, result)})
                }
                _ => message.clone(),
            }
        })
        .collect()
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    fn tools() -> Vec<Tool> {
        vec![
            Tool::new("get_weather", "Weather by city", json!({"type": "object", "properties": {"city": {"type": "string"}}})),
            Tool::new("get_time", "", json!({"type": "object", "properties": {}})),
        ]
    }

    #[test]
    fn test_render_is_deterministic() {
        let a = render_tool_prompt(&tools(), &ToolChoice::Auto, ModelFamily::Google);
        let b = render_tool_prompt(&tools(), &ToolChoice::Auto, ModelFamily::Google);
        assert_eq!(a, b);
    }

    #[test]
    fn test_render_lists_tools_in_order_with_convention() {
        let prompt = render_tool_prompt(&tools(), &ToolChoice::Required, ModelFamily::Unknown);
        let weather = prompt.find("get_weather").unwrap();
        let time = prompt.find("get_time").unwrap();
        assert!(weather < time);
        assert!(prompt.contains("<tool_call>"));
        assert!(prompt.contains("</tool_call>"));
        assert!(prompt.contains("at least one tool"));
    }

    #[test]
    fn test_templates_differ_by_family() {
        let google = render_tool_prompt(&tools(), &ToolChoice::Auto, ModelFamily::Google);
        let generic = render_tool_prompt(&tools(), &ToolChoice::Auto, ModelFamily::Unknown);
        assert_ne!(google, generic);
    }

    #[test]
    fn test_named_choice_instruction() {
        let prompt = render_tool_prompt(&tools(), &ToolChoice::Named("get_time".into()), ModelFamily::Anthropic);
        assert!(prompt.contains("You must call the tool 'get_time'"));
    }

    #[test]
    fn test_with_tool_prompt_leaves_messages_untouched() {
        let messages = vec![json!({"role": "user", "content": "hi"})];
        let out = with_tool_prompt(&messages, "TOOLS");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], json!({"role": "system", "content": "TOOLS"}));
        assert_eq!(out[1], messages[0]);
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_flatten_tool_history() {
        let messages = vec![
            json!({"role": "assistant", "content": null, "tool_calls": [
                {"id": "call_1", "type": "function", "function": {"name": "get_time", "arguments": "{}"}}
            ]}),
            json!({"role": "tool", "tool_call_id": "call_1", "content": "12:00"}),
        ];
        let flat = flatten_tool_history(&messages);
        assert_eq!(flat[0]["content"], json!("<tool_call>{\"name\": \"get_time\", \"arguments\": {}}</tool_call>"));
        assert_eq!(flat[1], json!({"role": "user", "content": "Tool result (call_1): 12:00"}));
    }
}
