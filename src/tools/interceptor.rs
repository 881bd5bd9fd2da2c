//!
//! Tool-call interception on upstream output.
//!
//! Native output is decoded through the [`FormatConverter`]; free text is
//! scanned left to right for `<tool_call> ... </tool_call>` blocks. A block
//! opens at the last `<tool_call>` before its closing tag, so a stray opening
//! tag stays plain text. A block that does not hold a valid call is dropped
//! with a single warning and the scan carries on.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::strategy::Strategy;
use super::{CallIdGenerator, FinishReason, ModelFamily, ToolCall, TranslationResult, arguments_text};
use crate::converter::FormatConverter;
use crate::converter::messages::content_text;

/* --- constants ------------------------------------------------------------------------------- */

static OPEN_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<tool_call>").expect("tool call pattern is valid"));

static CLOSE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</tool_call>").expect("tool call pattern is valid"));

/* --- types ----------------------------------------------------------------------------------- */

///
/// Extracts canonical tool calls and residual text from one upstream response.
#[derive(Debug, Clone)]
pub struct ToolInterceptor {
    /** id source for calls without an upstream id */
    ids: CallIdGenerator,
    /** native payload decoder */
    converter: FormatConverter,
}

/* --- start of code -------------------------------------------------------------------------- */

impl ToolInterceptor {
    ///
    /// Create an interceptor.
    ///
    /// # Arguments
    ///  * `ids` - id generator; a fixed seed makes `process` fully deterministic
    ///  * `converter` - decoder for native payloads
    pub fn new(ids: CallIdGenerator, converter: FormatConverter) -> Self {
        Self { ids, converter }
    }

    /// Interceptor with a fixed id seed.
    pub fn with_seed(seed: impl Into<String>) -> Self {
        Self::new(CallIdGenerator::new(seed), FormatConverter::default())
    }

    ///
    /// Turns raw upstream output into a [`TranslationResult`].
    ///
    /// # Arguments
    ///  * `raw` - structured payload, or a JSON string holding the model's text
    ///  * `family` - family that produced the output
    ///  * `strategy` - strategy the request was dispatched with
    ///
    /// # Returns
    ///  * calls in the order produced, residual content and finish reason
    pub fn process(&self, raw: &Value, family: ModelFamily, strategy: Strategy) -> TranslationResult {
        match (strategy, raw) {
            (_, Value::String(text)) => self.scan_text(text),
            (Strategy::Native, structured) => self.process_native(structured, family),
            (Strategy::PromptBased, structured) => self.scan_text(&native_content(structured)),
        }
    }

    fn process_native(&self, payload: &Value, family: ModelFamily) -> TranslationResult {
        let calls = self.converter.decode(payload, family, &self.ids);
        let content = native_content(payload);
        let signal = native_finish_signal(payload).and_then(FinishReason::from_provider_signal);

        let finish_reason = match (signal, calls.is_empty()) {
            (Some(FinishReason::Stop) | Some(FinishReason::ToolCalls) | None, false) => FinishReason::ToolCalls,
            (Some(FinishReason::ToolCalls) | None, true) => FinishReason::Stop,
            (Some(other), _) => other,
        };
        TranslationResult { content, calls, finish_reason }
    }

    ///
    /// Scans free text for tool-call blocks.
    ///
    /// Text outside successfully parsed blocks is kept, in order, as content.
    /// Malformed blocks stay in the content verbatim.
    pub fn scan_text(&self, text: &str) -> TranslationResult {
        let mut calls = Vec::new();
        let mut residual = String::with_capacity(text.len());
        let mut cursor = 0;
        let mut scan_from = 0;

        for close in CLOSE_TAG.find_iter(text) {
            // a closing tag with no opening tag since the last block is text
            let Some(open) = OPEN_TAG.find_iter(&text[scan_from..close.start()]).last() else {
                continue;
            };
            let start = scan_from + open.start();
            let inner = &text[scan_from + open.end()..close.start()];
            scan_from = close.end();

            match parse_block(inner) {
                Ok((name, arguments)) => {
                    residual.push_str(&text[cursor..start]);
                    cursor = close.end();
                    calls.push(ToolCall { id: self.ids.id_for(calls.len()), name, arguments });
                }
                Err(reason) => {
                    tracing::warn!("Failed to parse tool call block at offset {}: {}", start, reason);
                }
            }
        }
        residual.push_str(&text[cursor..]);

        let finish_reason =
            if calls.is_empty() { FinishReason::Stop } else { FinishReason::ToolCalls };
        TranslationResult { content: residual.trim().to_string(), calls, finish_reason }
    }
}

impl Default for ToolInterceptor {
    fn default() -> Self {
        Self::new(CallIdGenerator::random(), FormatConverter::default())
    }
}

fn parse_block(inner: &str) -> Result<(String, String), String> {
    let body = strip_code_fence(inner.trim());
    let value: Value = serde_json::from_str(body).map_err(|e| format!("invalid JSON: {}", e))?;
    let obj = value.as_object().ok_or("block is not a JSON object")?;

    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .ok_or("missing tool name")?;
    let arguments = obj.get("arguments").or_else(|| obj.get("parameters")).unwrap_or(&Value::Null);
    if !matches!(arguments, Value::Object(_) | Value::String(_) | Value::Null) {
        return Err("arguments must be an object".to_string());
    }
    let arguments = arguments_text(arguments)?;
    Ok((name.to_string(), arguments))
}

fn strip_code_fence(body: &str) -> &str {
    let Some(rest) = body.strip_prefix("```") else {
        return body;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Text content of a structured response, wherever the provider put it.
fn native_content(payload: &Value) -> String {
    match payload {
        Value::Object(map) => {
            if let Some(inner) = map.get("response") {
                return native_content(inner);
            }
            if let Some(message) = map
                .get("choices")
                .and_then(|c| c.get(0))
                .and_then(|c| c.get("message"))
            {
                return native_content(message);
            }
            map.get("content").map(content_text).unwrap_or_default()
        }
        Value::String(s) => s.clone(),
        _ => String::new(),
    }
}

fn native_finish_signal(payload: &Value) -> Option<&str> {
    let map = payload.as_object()?;
    for key in ["finish_reason", "stop_reason"] {
        if let Some(signal) = map.get(key).and_then(Value::as_str) {
            return Some(signal);
        }
    }
    if let Some(inner) = map.get("response") {
        return native_finish_signal(inner);
    }
    map.get("choices").and_then(|c| c.get(0)).and_then(native_finish_signal)
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::capture::LogBuffer;
    use serde_json::json;
    use tracing::Level;

    fn interceptor() -> ToolInterceptor {
        ToolInterceptor::with_seed("t")
    }

    #[test]
    fn test_prompt_block_with_residual_text() {
        let text = "Checking... <tool_call>{\"name\":\"get_weather\",\"arguments\":{\"city\":\"Paris\"}}</tool_call>";
        let result = interceptor().process(&json!(text), ModelFamily::Google, Strategy::PromptBased);
        assert_eq!(result.calls.len(), 1);
        assert_eq!(result.calls[0].name, "get_weather");
        assert_eq!(result.calls[0].arguments, "{\"city\":\"Paris\"}");
        assert_eq!(result.content, "Checking...");
        assert_eq!(result.finish_reason, FinishReason::ToolCalls);
    }

    #[test]
    fn test_text_on_both_sides_is_concatenated() {
        let text = "Pre text<tool_call>{\"name\": \"t\", \"arguments\": {}}</tool_call>post text";
        let result = interceptor().scan_text(text);
        assert_eq!(result.content, "Pre textpost text");
    }

    #[test]
    fn test_single_malformed_block_keeps_raw_text() {
        let text = "<tool_call>{\"name\": \"get_weather\", \"arguments\": {\"city\": }</tool_call>";
        let result = interceptor().scan_text(text);
        assert!(result.calls.is_empty());
        assert_eq!(result.content, text);
        assert_eq!(result.finish_reason, FinishReason::Stop);
    }

    #[test]
    fn test_one_malformed_among_many() {
        let (logs, _guard) = LogBuffer::install();
        let text = "a<tool_call>{\"name\":\"one\",\"arguments\":{}}</tool_call>\
                    b<tool_call>{broken</tool_call>\
                    c<tool_call>{\"name\":\"three\",\"arguments\":\"{\\\"x\\\": 1}\"}</tool_call>";
        let result = interceptor().scan_text(text);
        assert_eq!(logs.count(Level::WARN), 1, "logs: {}", logs.contents());
        assert_eq!(result.calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(), ["one", "three"]);
        assert_eq!(result.calls[1].arguments, "{\"x\": 1}");
        assert_eq!(result.calls[0].id, "call_t_0");
        assert_eq!(result.calls[1].id, "call_t_1");
        assert!(result.content.contains("{broken"));
    }

    #[test]
    fn test_each_dropped_block_warns_once() {
        let (logs, _guard) = LogBuffer::install();
        let text = "<tool_call>{broken</tool_call> x <tool_call>{\"arguments\": {}}</tool_call> \
                    <tool_call>{\"name\": \"ok\"}</tool_call>";
        let result = interceptor().scan_text(text);
        assert_eq!(result.calls.len(), 1);
        assert_eq!(logs.count(Level::WARN), 2, "logs: {}", logs.contents());
        assert!(logs.contents().contains("missing tool name"));
    }

    #[test]
    fn test_stray_opening_tag_does_not_swallow_block() {
        let (logs, _guard) = LogBuffer::install();
        let text = "junk <tool_call> more <tool_call>{\"name\": \"ping\", \"arguments\": {}}</tool_call> tail";
        let result = interceptor().scan_text(text);
        assert_eq!(result.calls.len(), 1);
        assert_eq!(result.calls[0].name, "ping");
        assert_eq!(result.calls[0].id, "call_t_0");
        assert_eq!(result.content, "junk <tool_call> more  tail");
        assert_eq!(result.finish_reason, FinishReason::ToolCalls);
        assert_eq!(logs.count(Level::WARN), 0, "logs: {}", logs.contents());
    }

    #[test]
    fn test_stray_closing_tag_is_text() {
        let text = "a </tool_call> b <tool_call>{\"name\": \"ping\"}</tool_call>";
        let result = interceptor().scan_text(text);
        assert_eq!(result.calls.len(), 1);
        assert_eq!(result.content, "a </tool_call> b");
    }

    #[test]
    fn test_case_insensitive_tags_and_fences() {
        let text = "<TOOL_CALL>\n```json\n{\"name\": \"ping\", \"parameters\": {\"host\": \"a\"}}\n```\n</Tool_Call>";
        let result = interceptor().scan_text(text);
        assert_eq!(result.calls.len(), 1);
        assert_eq!(result.calls[0].arguments, "{\"host\":\"a\"}");
        assert_eq!(result.content, "");
    }

    #[test]
    fn test_unclosed_tag_is_text() {
        let result = interceptor().scan_text("hello <tool_call>{\"name\": \"x\"}");
        assert!(result.calls.is_empty());
        assert_eq!(result.content, "hello <tool_call>{\"name\": \"x\"}");
    }

    #[test]
    fn test_process_is_deterministic() {
        let text = json!("x <tool_call>{\"name\":\"a\",\"arguments\":{\"k\":1}}</tool_call> y");
        let i = interceptor();
        let first = i.process(&text, ModelFamily::Unknown, Strategy::PromptBased);
        let second = i.process(&text, ModelFamily::Unknown, Strategy::PromptBased);
        assert_eq!(first, second);
    }

    #[test]
    fn test_native_openai_tool_calls() {
        let payload = json!({
            "content": null,
            "tool_calls": [{
                "id": "call_abc123",
                "type": "function",
                "function": {"name": "get_weather", "arguments": "{\"city\":\"Paris\"}"}
            }]
        });
        let result = interceptor().process(&payload, ModelFamily::OpenAI, Strategy::Native);
        assert_eq!(result.calls[0].id, "call_abc123");
        assert_eq!(result.finish_reason, FinishReason::ToolCalls);
        assert_eq!(result.content, "");
    }

    #[test]
    fn test_native_anthropic_stop_reason_mapping() {
        let payload = json!({
            "content": [{"type": "text", "text": "partial"}],
            "stop_reason": "max_tokens"
        });
        let result = interceptor().process(&payload, ModelFamily::Anthropic, Strategy::Native);
        assert_eq!(result.finish_reason, FinishReason::Length);
        assert_eq!(result.content, "partial");
    }

    #[test]
    fn test_native_text_falls_back_to_scan() {
        let raw = json!("<tool_call>{\"name\":\"a\",\"arguments\":{}}</tool_call>");
        let result = interceptor().process(&raw, ModelFamily::Anthropic, Strategy::Native);
        assert_eq!(result.calls.len(), 1);
    }

    #[test]
    fn test_prompt_mode_reads_wrapped_text() {
        let payload = json!({"response": {"content": "<tool_call>{\"name\":\"a\",\"arguments\":{}}</tool_call>"}});
        let result = interceptor().process(&payload, ModelFamily::Google, Strategy::PromptBased);
        assert_eq!(result.calls.len(), 1);
    }

    #[test]
    fn test_non_object_arguments_rejected() {
        let result = interceptor().scan_text("<tool_call>{\"name\":\"a\",\"arguments\":[1,2]}</tool_call>");
        assert!(result.calls.is_empty());
    }
}
