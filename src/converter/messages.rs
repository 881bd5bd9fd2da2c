//!
//! Message content helpers.
//!
//! Flattens OpenAI multimodal content arrays to plain text for upstreams that
//! only accept strings, and reads text back out of provider content fields.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use serde_json::Value;

use crate::error::{ValidationError, ValidationErrorKind};

/* --- start of code -------------------------------------------------------------------------- */

///
/// Replaces every array-valued `content` with its text parts joined by a space.
///
/// # Arguments
///  * `messages` - caller messages (left untouched)
///
/// # Returns
///  * flattened copies, or `UnsupportedContent` naming the first non-text part
pub fn flatten_multimodal(messages: &[Value]) -> Result<Vec<Value>, ValidationError> {
    messages
        .iter()
        .enumerate()
        .map(|(i, message)| {
            let mut message = message.clone();
            if let Some(Value::Array(parts)) = message.get("content") {
                let text = join_text_parts(parts, &format!("messages[{}].content", i))?;
                message["content"] = Value::String(text);
            }
            Ok(message)
        })
        .collect()
}

fn join_text_parts(parts: &[Value], path: &str) -> Result<String, ValidationError> {
    let mut texts = Vec::with_capacity(parts.len());
    for (j, part) in parts.iter().enumerate() {
        match part {
            Value::String(s) => texts.push(s.as_str()),
            Value::Object(obj) => {
                let kind = obj.get("type").and_then(Value::as_str).unwrap_or("text");
                if kind != "text" {
                    return Err(ValidationError::new(
                        ValidationErrorKind::UnsupportedContent,
                        format!("{}[{}]", path, j),
                        format!("content part type '{}' is not supported by this model", kind),
                    ));
                }
                texts.push(obj.get("text").and_then(Value::as_str).unwrap_or(""));
            }
            _ => {
                return Err(ValidationError::new(
                    ValidationErrorKind::UnsupportedContent,
                    format!("{}[{}]", path, j),
                    "content parts must be objects or strings",
                ));
            }
        }
    }
    Ok(texts.join(" "))
}

///
/// Text carried by a provider content field: a string, or the concatenated
/// `text` of its text blocks.
pub fn content_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str).is_none_or(|t| t == "text"))
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(""),
        _ => String::new(),
    }
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_text_parts() {
        let messages = vec![
            json!({"role": "system", "content": "be brief"}),
            json!({"role": "user", "content": [{"type": "text", "text": "Hello"}, {"type": "text", "text": "there"}]}),
        ];
        let flat = flatten_multimodal(&messages).unwrap();
        assert_eq!(flat[0]["content"], json!("be brief"));
        assert_eq!(flat[1]["content"], json!("Hello there"));
        assert!(messages[1]["content"].is_array());
    }

    #[test]
    fn test_flatten_rejects_images() {
        let messages = vec![json!({"role": "user", "content": [
            {"type": "text", "text": "look"},
            {"type": "image_url", "image_url": {"url": "https://x/y.png"}}
        ]})];
        let err = flatten_multimodal(&messages).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::UnsupportedContent);
        assert_eq!(err.path, "messages[0].content[1]");
    }

    #[test]
    fn test_content_text_blocks() {
        let content = json!([
            {"type": "text", "text": "a"},
            {"type": "tool_use", "name": "x", "input": {}},
            {"type": "text", "text": "b"}
        ]);
        assert_eq!(content_text(&content), "ab");
        assert_eq!(content_text(&Value::Null), "");
    }
}
