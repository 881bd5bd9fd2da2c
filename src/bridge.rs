//!
//! Chat completion bridging.
//!
//! Turns one OpenAI-style chat request into an upstream exchange and the
//! upstream answer back into a [`TranslationResult`]:
//!
//! 1. resolve the model route and validate the tool section,
//! 2. build the outbound gateway body (flattening multimodal content for
//!    Gemini models),
//! 3. run the strategy selector when tools are present, a plain dispatch
//!    otherwise,
//! 4. extract tool calls from the reply.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::config::Config;
use crate::converter::messages::flatten_multimodal;
use crate::converter::{FormatConverter, OpenAiToolCall};
use crate::dispatch::{Dispatcher, OutboundRequest, PreparedPayload, UpstreamReply};
use crate::error::{BridgeError, Result, ValidationError, ValidationErrorKind};
use crate::logging::log_tool_processing;
use crate::provider::{DEFAULT_MODEL, ModelRegistry, ModelRoute};
use crate::stream::StreamMode;
use crate::tools::interceptor::ToolInterceptor;
use crate::tools::schema::parse_tool_request;
use crate::tools::strategy::{Strategy, StrategySelector};
use crate::tools::{CallIdGenerator, FinishReason, ModelFamily, ToolChoice, ToolRequest, TranslationResult};

/* --- constants ------------------------------------------------------------------------------- */

/** sampling temperature when the request sets none */
const DEFAULT_TEMPERATURE: f64 = 0.1;

/* --- types ----------------------------------------------------------------------------------- */

///
/// Fields of an inbound chat request the bridge reads. Everything else is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub messages: Option<Vec<Value>>,
    #[serde(default)]
    pub stream: Option<bool>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u64>,
    #[serde(default)]
    pub stop: Option<Value>,
    #[serde(default)]
    pub tools: Option<Value>,
    #[serde(default)]
    pub tool_choice: Option<Value>,
    /** bridge-only switch to prompt-embedded tools; never forwarded upstream */
    #[serde(default)]
    pub force_prompt_mode: Option<bool>,
}

///
/// A validated request, ready to dispatch.
#[derive(Debug, Clone)]
pub struct ChatExchange {
    /** model name as the client sent it, echoed in responses */
    pub model: String,
    /** resolved upstream route */
    pub route: ModelRoute,
    /** gateway body without tool fields */
    pub outbound: OutboundRequest,
    /** validated tools, `None` when the request has none */
    pub tools: Option<ToolRequest>,
    /** client asked for SSE */
    pub stream: bool,
}

///
/// Finished exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub result: TranslationResult,
    /** strategy that produced the answer; tool-free requests report `Native` */
    pub strategy: Strategy,
    /** native tool calling was abandoned for the prompt path */
    pub fell_back: bool,
}

///
/// Non-streaming `chat.completion` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionChoice {
    pub index: u32,
    pub message: AssistantMessage,
    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub role: String,
    /** `null` when empty and tool calls are present */
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OpenAiToolCall>>,
}

///
/// Request preparation and completion for all chat endpoints.
#[derive(Debug, Clone)]
pub struct ChatBridge {
    /** model alias table */
    registry: ModelRegistry,
    /** native/prompt strategy state machine */
    selector: StrategySelector,
    /** native tool decoder handed to each interceptor */
    converter: FormatConverter,
}

/* --- start of code -------------------------------------------------------------------------- */

impl ChatRequest {
    ///
    /// Reads a request body.
    ///
    /// # Returns
    ///  * the request, or `MissingField` when the body is malformed or has no messages
    pub fn from_value(body: Value) -> Result<Self> {
        let request: ChatRequest = serde_json::from_value(body).map_err(|e| {
            ValidationError::new(ValidationErrorKind::MissingField, "body", format!("invalid request body: {}", e))
        })?;
        match &request.messages {
            None => Err(ValidationError::new(ValidationErrorKind::MissingField, "messages", "messages is required").into()),
            Some(messages) if messages.is_empty() => Err(ValidationError::new(
                ValidationErrorKind::MissingField,
                "messages",
                "messages must contain at least one message",
            )
            .into()),
            Some(_) => Ok(request),
        }
    }
}

impl ChatExchange {
    pub fn family(&self) -> ModelFamily {
        self.route.family
    }

    ///
    /// How `stream: true` is served: tool requests and models the upstream
    /// cannot stream are emulated from the complete answer.
    pub fn stream_mode(&self) -> StreamMode {
        if self.tools.is_some() || !self.route.streams {
            StreamMode::Emulated
        } else {
            StreamMode::PassThrough
        }
    }
}

impl ChatCompletion {
    ///
    /// Builds the response body for a finished result.
    ///
    /// # Arguments
    ///  * `id` - completion id
    ///  * `created` - creation timestamp in seconds
    ///  * `model` - model name reported to the client
    ///  * `result` - translated answer
    pub fn from_result(id: impl Into<String>, created: i64, model: impl Into<String>, result: &TranslationResult) -> Self {
        let content = if result.content.is_empty() && result.has_tool_calls() {
            None
        } else {
            Some(result.content.clone())
        };
        let tool_calls = result
            .has_tool_calls()
            .then(|| result.calls.iter().map(OpenAiToolCall::from).collect());

        Self {
            id: id.into(),
            object: "chat.completion".to_string(),
            created,
            model: model.into(),
            choices: vec![CompletionChoice {
                index: 0,
                message: AssistantMessage { role: "assistant".to_string(), content, tool_calls },
                finish_reason: result.finish_reason,
            }],
        }
    }
}

impl ChatBridge {
    ///
    /// Create the bridge.
    ///
    /// # Arguments
    ///  * `config` - effective configuration
    ///  * `registry` - model routing table
    pub fn new(config: &Config, registry: ModelRegistry) -> Self {
        let converter = FormatConverter::new(config.effective_log_level());
        Self {
            registry,
            selector: StrategySelector::new(converter.clone(), config.tools.force_prompt_mode),
            converter,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    ///
    /// Validates a request and builds its upstream exchange.
    ///
    /// # Arguments
    ///  * `request` - parsed request
    ///  * `user` - upstream user name
    ///
    /// # Returns
    ///  * the exchange; `UnknownModel` or `Validation` errors otherwise
    pub fn prepare(&self, request: ChatRequest, user: &str) -> Result<ChatExchange> {
        let model = request.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let route = self.registry.resolve(Some(&model))?.clone();
        let tools = parse_tool_request(request.tools.as_ref(), request.tool_choice.as_ref())?.map(|mut tools| {
            tools.force_prompt_mode = request.force_prompt_mode.unwrap_or(false);
            tools
        });

        let messages = request.messages.unwrap_or_default();
        let messages = match route.family {
            ModelFamily::Google => flatten_multimodal(&messages)?,
            _ => messages,
        };

        let mut body = Map::new();
        body.insert("user".to_string(), json!(user));
        body.insert("model".to_string(), json!(route.upstream_id));
        body.insert("messages".to_string(), Value::Array(messages));
        body.insert("system".to_string(), json!(""));
        body.insert("stop".to_string(), request.stop.unwrap_or_else(|| json!([])));
        body.insert("temperature".to_string(), json!(request.temperature.unwrap_or(DEFAULT_TEMPERATURE)));
        if let Some(max_tokens) = request.max_tokens {
            body.insert("max_tokens".to_string(), json!(max_tokens));
        }

        Ok(ChatExchange {
            model,
            outbound: OutboundRequest { environment: route.environment, body },
            route,
            tools,
            stream: request.stream.unwrap_or(false),
        })
    }

    ///
    /// Runs an exchange to completion.
    ///
    /// # Arguments
    ///  * `exchange` - prepared exchange
    ///  * `dispatcher` - upstream transport
    ///
    /// # Returns
    ///  * the translated answer, or the upstream failure
    pub async fn complete<D: Dispatcher + ?Sized>(&self, exchange: &ChatExchange, dispatcher: &D) -> Result<Completion> {
        let family = exchange.family();
        let interceptor = ToolInterceptor::new(CallIdGenerator::random(), self.converter.clone());

        let Some(tools) = &exchange.tools else {
            let payload = PreparedPayload {
                environment: exchange.outbound.environment,
                strategy: Strategy::Native,
                body: Value::Object(exchange.outbound.body.clone()),
            };
            let reply = dispatcher.dispatch(&payload, family).await.map_err(plain_request_error)?;
            let result = match reply {
                UpstreamReply::Text(text) => TranslationResult::text(text),
                UpstreamReply::Structured(value) => interceptor.process(&value, family, Strategy::Native),
            };
            return Ok(Completion { result, strategy: Strategy::Native, fell_back: false });
        };

        log_tool_processing(family, tools.tools.len(), self.selector.initial(family, tools) == Strategy::Native);
        let outcome = self.selector.execute(&exchange.outbound, tools, family, dispatcher).await?;
        let result = interceptor.process(&outcome.reply.into_value(), family, outcome.strategy);

        if tools.choice == ToolChoice::Required && !result.has_tool_calls() {
            tracing::warn!("tool_choice 'required' but the {} model returned no tool calls", family);
        }
        tracing::debug!(
            "Extracted {} tool call(s) via {} strategy, finish_reason={}",
            result.calls.len(),
            outcome.strategy.as_str(),
            result.finish_reason.as_str()
        );

        Ok(Completion { result, strategy: outcome.strategy, fell_back: outcome.fell_back })
    }
}

/// Tool-free requests have no tool schema to reject.
fn plain_request_error(error: BridgeError) -> BridgeError {
    match error {
        BridgeError::ToolSchemaRejected(_) => BridgeError::Upstream {
            status: 400,
            message: "Upstream rejected the request format.".to_string(),
        },
        other => other,
    }
}

///
/// Fresh `chatcmpl-` completion id.
pub fn completion_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4().simple())
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::ByteStream;
    use crate::provider::Environment;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingDispatcher {
        reply: UpstreamReply,
        seen: Mutex<Vec<PreparedPayload>>,
    }

    #[async_trait]
    impl Dispatcher for RecordingDispatcher {
        async fn dispatch(&self, payload: &PreparedPayload, _family: ModelFamily) -> Result<UpstreamReply> {
            self.seen.lock().unwrap().push(payload.clone());
            Ok(self.reply.clone())
        }

        async fn dispatch_stream(&self, _request: &OutboundRequest) -> Result<ByteStream> {
            Err(BridgeError::Http("not scripted".into()))
        }
    }

    fn bridge() -> ChatBridge {
        ChatBridge::new(&Config::default(), ModelRegistry::builtin())
    }

    fn request(body: Value) -> ChatRequest {
        ChatRequest::from_value(body).unwrap()
    }

    fn weather_tools() -> Value {
        json!([{"type": "function", "function": {
            "name": "get_weather",
            "parameters": {"type": "object", "properties": {"city": {"type": "string"}}}
        }}])
    }

    #[test]
    fn test_missing_messages() {
        let err = ChatRequest::from_value(json!({"model": "gpt4o"})).unwrap_err();
        assert_eq!(err.param(), Some("messages"));
        assert!(ChatRequest::from_value(json!({"messages": []})).is_err());
    }

    #[test]
    fn test_prepare_builds_gateway_body() {
        let exchange = bridge()
            .prepare(request(json!({"model": "gpt-4o", "messages": [{"role": "user", "content": "hi"}]})), "alice")
            .unwrap();
        assert_eq!(exchange.model, "gpt-4o");
        assert_eq!(exchange.outbound.environment, Environment::Prod);
        let body = Value::Object(exchange.outbound.body.clone());
        assert_eq!(
            body,
            json!({
                "user": "alice",
                "model": "gpt4o",
                "messages": [{"role": "user", "content": "hi"}],
                "system": "",
                "stop": [],
                "temperature": 0.1
            })
        );
        assert!(exchange.tools.is_none());
        assert_eq!(exchange.stream_mode(), StreamMode::PassThrough);
    }

    #[test]
    fn test_unknown_model() {
        let err = bridge()
            .prepare(request(json!({"model": "llama", "messages": [{"role": "user", "content": "hi"}]})), "u")
            .unwrap_err();
        assert!(matches!(err, BridgeError::UnknownModel(_)));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_gemini_multimodal_is_flattened() {
        let exchange = bridge()
            .prepare(
                request(json!({"model": "gemini25pro", "messages": [{"role": "user", "content": [
                    {"type": "text", "text": "Describe"},
                    {"type": "text", "text": "this"}
                ]}]})),
                "u",
            )
            .unwrap();
        assert_eq!(exchange.outbound.body["messages"][0]["content"], json!("Describe this"));
        assert_eq!(exchange.stream_mode(), StreamMode::Emulated);
    }

    #[test]
    fn test_gemini_image_part_rejected() {
        let err = bridge()
            .prepare(
                request(json!({"model": "gemini25pro", "messages": [{"role": "user", "content": [
                    {"type": "image_url", "image_url": {"url": "data:"}}
                ]}]})),
                "u",
            )
            .unwrap_err();
        assert_eq!(err.param(), Some("messages[0].content[0]"));
    }

    #[test]
    fn test_tools_force_emulated_streaming() {
        let exchange = bridge()
            .prepare(
                request(json!({"model": "gpt4o", "stream": true, "tools": weather_tools(),
                    "messages": [{"role": "user", "content": "weather?"}]})),
                "u",
            )
            .unwrap();
        assert!(exchange.stream);
        assert_eq!(exchange.stream_mode(), StreamMode::Emulated);
    }

    #[tokio::test]
    async fn test_request_override_forces_prompt_tools() {
        let dispatcher = RecordingDispatcher {
            reply: UpstreamReply::Text(
                "<tool_call>{\"name\": \"get_weather\", \"arguments\": {\"city\": \"Oslo\"}}</tool_call>".into(),
            ),
            seen: Mutex::new(Vec::new()),
        };
        let b = bridge();
        let exchange = b
            .prepare(
                request(json!({"model": "gpt4o", "tools": weather_tools(), "force_prompt_mode": true,
                    "messages": [{"role": "user", "content": "weather?"}]})),
                "u",
            )
            .unwrap();
        assert!(exchange.tools.as_ref().unwrap().force_prompt_mode);
        assert!(exchange.outbound.body.get("force_prompt_mode").is_none());

        let completion = b.complete(&exchange, &dispatcher).await.unwrap();
        assert_eq!(completion.strategy, Strategy::PromptBased);
        assert!(!completion.fell_back);
        assert_eq!(completion.result.calls[0].name, "get_weather");

        let seen = dispatcher.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].strategy, Strategy::PromptBased);
        assert!(seen[0].body.get("tools").is_none());
        assert!(seen[0].body.get("force_prompt_mode").is_none());
    }

    #[tokio::test]
    async fn test_plain_completion_keeps_text() {
        let dispatcher = RecordingDispatcher {
            reply: UpstreamReply::Text("Hello there".into()),
            seen: Mutex::new(Vec::new()),
        };
        let b = bridge();
        let exchange = b.prepare(request(json!({"messages": [{"role": "user", "content": "hi"}]})), "u").unwrap();
        let completion = b.complete(&exchange, &dispatcher).await.unwrap();
        assert_eq!(completion.result, TranslationResult::text("Hello there"));
        assert_eq!(completion.strategy, Strategy::Native);
        assert!(dispatcher.seen.lock().unwrap()[0].body.get("tools").is_none());
    }

    #[tokio::test]
    async fn test_prompt_strategy_for_gemini_tools() {
        let dispatcher = RecordingDispatcher {
            reply: UpstreamReply::Text(
                "<tool_call>{\"name\": \"get_weather\", \"arguments\": {\"city\": \"Paris\"}}</tool_call>".into(),
            ),
            seen: Mutex::new(Vec::new()),
        };
        let b = bridge();
        let exchange = b
            .prepare(
                request(json!({"model": "gemini25flash", "tools": weather_tools(),
                    "messages": [{"role": "user", "content": "weather?"}]})),
                "u",
            )
            .unwrap();
        let completion = b.complete(&exchange, &dispatcher).await.unwrap();
        assert_eq!(completion.strategy, Strategy::PromptBased);
        assert_eq!(completion.result.finish_reason, FinishReason::ToolCalls);
        assert_eq!(completion.result.calls[0].name, "get_weather");
        assert_eq!(completion.result.calls[0].arguments, "{\"city\":\"Paris\"}");
    }

    #[test]
    fn test_completion_body_with_calls() {
        let result = TranslationResult {
            content: String::new(),
            calls: vec![crate::tools::ToolCall {
                id: "call_1".into(),
                name: "get_weather".into(),
                arguments: "{}".into(),
            }],
            finish_reason: FinishReason::ToolCalls,
        };
        let value = serde_json::to_value(ChatCompletion::from_result("id", 1, "gpt4o", &result)).unwrap();
        assert_eq!(value["choices"][0]["message"]["content"], Value::Null);
        assert_eq!(value["choices"][0]["message"]["tool_calls"][0]["function"]["name"], json!("get_weather"));
        assert_eq!(value["choices"][0]["finish_reason"], json!("tool_calls"));
    }

    #[test]
    fn test_completion_body_without_calls() {
        let value =
            serde_json::to_value(ChatCompletion::from_result("id", 1, "gpt4o", &TranslationResult::text(""))).unwrap();
        assert_eq!(value["choices"][0]["message"]["content"], json!(""));
        assert!(value["choices"][0]["message"].get("tool_calls").is_none());
    }
}
