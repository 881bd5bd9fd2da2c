//!
//! `chat.completion.chunk` wire encoding of delta events.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use serde::{Deserialize, Serialize};

use super::DeltaEvent;
use crate::tools::FinishReason;

/* --- constants ------------------------------------------------------------------------------- */

/// Terminal SSE data line of a completed stream.
pub const DONE_MARKER: &str = "[DONE]";

/* --- types ----------------------------------------------------------------------------------- */

///
/// OpenAI streaming chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: ChunkDelta,
    /** always serialized, `null` until the final chunk */
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ChunkToolCall>>,
}

///
/// Tool call fragment; only the first fragment of a call carries id, type and name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkToolCall {
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,
    pub function: ChunkFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkFunction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub arguments: String,
}

///
/// Stamps delta events with the identity of one streamed completion.
#[derive(Debug, Clone)]
pub struct ChunkEncoder {
    /** completion id shared by all chunks */
    id: String,
    /** creation timestamp (seconds) */
    created: i64,
    /** model name reported to the client */
    model: String,
}

/* --- start of code -------------------------------------------------------------------------- */

impl ChunkEncoder {
    pub fn new(id: impl Into<String>, created: i64, model: impl Into<String>) -> Self {
        Self { id: id.into(), created, model: model.into() }
    }

    ///
    /// Encodes one event; a tool call yields one chunk per argument fragment.
    pub fn encode(&self, event: &DeltaEvent) -> Vec<ChatCompletionChunk> {
        match event {
            DeltaEvent::Role => vec![self.chunk(
                ChunkDelta {
                    role: Some("assistant".to_string()),
                    content: Some(String::new()),
                    tool_calls: None,
                },
                None,
            )],
            DeltaEvent::Content(text) => vec![self.chunk(
                ChunkDelta { content: Some(text.clone()), ..ChunkDelta::default() },
                None,
            )],
            DeltaEvent::ToolCall { index, id, name, argument_chunks } => argument_chunks
                .iter()
                .enumerate()
                .map(|(n, fragment)| {
                    let first = n == 0;
                    let call = ChunkToolCall {
                        index: *index as u32,
                        id: first.then(|| id.clone()),
                        call_type: first.then(|| "function".to_string()),
                        function: ChunkFunction {
                            name: first.then(|| name.clone()),
                            arguments: fragment.clone(),
                        },
                    };
                    self.chunk(
                        ChunkDelta { tool_calls: Some(vec![call]), ..ChunkDelta::default() },
                        None,
                    )
                })
                .collect(),
            DeltaEvent::Final(reason) => vec![self.chunk(ChunkDelta::default(), Some(*reason))],
        }
    }

    fn chunk(&self, delta: ChunkDelta, finish_reason: Option<FinishReason>) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![ChunkChoice { index: 0, delta, finish_reason }],
        }
    }
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encoder() -> ChunkEncoder {
        ChunkEncoder::new("chatcmpl-1", 1_700_000_000, "gpt4o")
    }

    #[test]
    fn test_role_chunk() {
        let chunks = encoder().encode(&DeltaEvent::Role);
        let value = serde_json::to_value(&chunks[0]).unwrap();
        assert_eq!(value["choices"][0]["delta"], json!({"role": "assistant", "content": ""}));
        assert_eq!(value["choices"][0]["finish_reason"], json!(null));
        assert_eq!(value["object"], json!("chat.completion.chunk"));
    }

    #[test]
    fn test_tool_call_fragments() {
        let event = DeltaEvent::ToolCall {
            index: 1,
            id: "call_9".into(),
            name: "get_weather".into(),
            argument_chunks: vec!["{\"city\":".into(), "\"Paris\"}".into()],
        };
        let chunks = encoder().encode(&event);
        assert_eq!(chunks.len(), 2);
        let first = serde_json::to_value(&chunks[0]).unwrap();
        let second = serde_json::to_value(&chunks[1]).unwrap();
        assert_eq!(
            first["choices"][0]["delta"]["tool_calls"][0],
            json!({"index": 1, "id": "call_9", "type": "function", "function": {"name": "get_weather", "arguments": "{\"city\":"}})
        );
        assert_eq!(
            second["choices"][0]["delta"]["tool_calls"][0],
            json!({"index": 1, "function": {"arguments": "\"Paris\"}"}})
        );
    }

    #[test]
    fn test_final_chunk() {
        let chunks = encoder().encode(&DeltaEvent::Final(FinishReason::ToolCalls));
        let value = serde_json::to_value(&chunks[0]).unwrap();
        assert_eq!(value["choices"][0]["delta"], json!({}));
        assert_eq!(value["choices"][0]["finish_reason"], json!("tool_calls"));
    }
}
