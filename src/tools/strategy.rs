//!
//! Tool strategy selection.
//!
//! Each tool-bearing request is first tried natively when the model family has
//! a native tool format and prompt mode is not forced. If the native encoding
//! is unsupported, or the upstream rejects the native tool schema, the request
//! is re-encoded with the prompt template and dispatched once more. There is
//! never a second retry: a failing prompt-based attempt ends the request with
//! an upstream error.
//!
//! ```text
//!   Native ──(UnsupportedFormat | ToolSchemaRejected)──> PromptBased
//!     │                                                    │
//!     ├── ok ──> Succeeded                    ok ──> Succeeded
//!     └── other error ──> Failed            error ──> Failed
//! ```
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use serde_json::Value;

use super::prompt::{TEMPLATE_VERSION, flatten_tool_history, render_tool_prompt, with_tool_prompt};
use super::{ModelFamily, ToolRequest};
use crate::converter::FormatConverter;
use crate::dispatch::{Dispatcher, OutboundRequest, PreparedPayload, UpstreamReply};
use crate::error::{BridgeError, Result};

/* --- types ----------------------------------------------------------------------------------- */

///
/// How tools are conveyed to the upstream model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /** provider's own tool format */
    Native,
    /** tool instructions embedded in a system message */
    PromptBased,
}

///
/// Selector states; `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyState {
    Native,
    PromptBased,
    Succeeded,
    Failed,
}

///
/// Result of a successful selector run.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyOutcome {
    /** upstream answer */
    pub reply: UpstreamReply,
    /** strategy that produced the answer */
    pub strategy: Strategy,
    /** whether the native attempt was abandoned for the prompt path */
    pub fell_back: bool,
    /** states visited, ending in `Succeeded` */
    pub states: Vec<StrategyState>,
}

///
/// Chooses and runs a tool strategy for one request.
#[derive(Debug, Clone)]
pub struct StrategySelector {
    /** native tool encoder */
    converter: FormatConverter,
    /** always use the prompt path */
    force_prompt_mode: bool,
}

/* --- start of code -------------------------------------------------------------------------- */

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Native => "native",
            Strategy::PromptBased => "prompt",
        }
    }
}

impl StrategySelector {
    ///
    /// Create a selector.
    ///
    /// # Arguments
    ///  * `converter` - encoder used on the native path
    ///  * `force_prompt_mode` - skip native tool calling for every family
    pub fn new(converter: FormatConverter, force_prompt_mode: bool) -> Self {
        Self { converter, force_prompt_mode }
    }

    ///
    /// Initial strategy for a request.
    ///
    /// # Arguments
    ///  * `family` - family of the target model
    ///  * `tools` - tool section; its `force_prompt_mode` overrides native support
    pub fn initial(&self, family: ModelFamily, tools: &ToolRequest) -> Strategy {
        if family.supports_native_tools() && !self.force_prompt_mode && !tools.force_prompt_mode {
            Strategy::Native
        } else {
            Strategy::PromptBased
        }
    }

    ///
    /// Builds the native payload: the base body plus the provider's tool fields.
    pub fn prepare_native(
        &self,
        base: &OutboundRequest,
        tools: &ToolRequest,
        family: ModelFamily,
    ) -> Result<PreparedPayload> {
        let encoded = self.converter.encode(&tools.tools, &tools.choice, family)?;
        let mut body = base.body.clone();
        encoded.apply_to(&mut body)?;
        Ok(PreparedPayload {
            environment: base.environment,
            strategy: Strategy::Native,
            body: Value::Object(body),
        })
    }

    ///
    /// Builds the prompt-based payload: flattened history behind a tool
    /// instruction system message, and no native tool fields.
    pub fn prepare_prompt(
        &self,
        base: &OutboundRequest,
        tools: &ToolRequest,
        family: ModelFamily,
    ) -> PreparedPayload {
        let messages = base
            .body
            .get("messages")
            .and_then(Value::as_array)
            .map(|m| flatten_tool_history(m))
            .unwrap_or_default();
        let prompt = render_tool_prompt(&tools.tools, &tools.choice, family);

        let mut body = base.body.clone();
        body.remove("tools");
        body.remove("tool_choice");
        body.insert("messages".to_string(), Value::Array(with_tool_prompt(&messages, &prompt)));
        PreparedPayload {
            environment: base.environment,
            strategy: Strategy::PromptBased,
            body: Value::Object(body),
        }
    }

    ///
    /// Runs the strategy state machine against a dispatcher.
    ///
    /// # Arguments
    ///  * `base` - outbound request without tool fields
    ///  * `tools` - validated tool section
    ///  * `family` - family of the target model
    ///  * `dispatcher` - upstream transport
    ///
    /// # Returns
    ///  * the successful outcome; validation errors unchanged; any failure of
    ///    the prompt-based attempt as `BridgeError::Upstream`
    pub async fn execute<D: Dispatcher + ?Sized>(
        &self,
        base: &OutboundRequest,
        tools: &ToolRequest,
        family: ModelFamily,
        dispatcher: &D,
    ) -> Result<StrategyOutcome> {
        let mut states = Vec::with_capacity(3);
        let mut fell_back = false;

        if self.initial(family, tools) == Strategy::Native {
            states.push(StrategyState::Native);
            let attempt = match self.prepare_native(base, tools, family) {
                Ok(payload) => dispatcher.dispatch(&payload, family).await,
                Err(e) => Err(e),
            };
            match attempt {
                Ok(reply) => {
                    states.push(StrategyState::Succeeded);
                    return Ok(StrategyOutcome { reply, strategy: Strategy::Native, fell_back, states });
                }
                Err(e) if e.is_fallback_trigger() => {
                    tracing::warn!(
                        "Native tool calling failed for {} model ({}), falling back to prompt-based tools",
                        family,
                        e
                    );
                    fell_back = true;
                }
                Err(e) => {
                    states.push(StrategyState::Failed);
                    tracing::debug!("Native tool request failed: {} (states: {:?})", e, states);
                    return Err(e);
                }
            }
        }

        states.push(StrategyState::PromptBased);
        tracing::debug!(
            "Using prompt-based tools for {} model (template v{})",
            family,
            TEMPLATE_VERSION
        );
        let payload = self.prepare_prompt(base, tools, family);
        match dispatcher.dispatch(&payload, family).await {
            Ok(reply) => {
                states.push(StrategyState::Succeeded);
                Ok(StrategyOutcome { reply, strategy: Strategy::PromptBased, fell_back, states })
            }
            Err(e) => {
                states.push(StrategyState::Failed);
                tracing::error!("Prompt-based tool request failed: {} (states: {:?})", e, states);
                Err(into_upstream_error(e))
            }
        }
    }
}

fn into_upstream_error(error: BridgeError) -> BridgeError {
    match error {
        upstream @ BridgeError::Upstream { .. } => upstream,
        other => BridgeError::Upstream {
            status: match other.status_code() {
                status if status >= 500 => status,
                _ => 502,
            },
            message: other.public_message(),
        },
    }
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::ByteStream;
    use crate::logging::capture::LogBuffer;
    use crate::provider::Environment;
    use crate::tools::{Tool, ToolChoice};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replays scripted results and records every payload it receives.
    struct ScriptedDispatcher {
        replies: Mutex<Vec<Result<UpstreamReply>>>,
        seen: Mutex<Vec<PreparedPayload>>,
    }

    impl ScriptedDispatcher {
        fn new(mut replies: Vec<Result<UpstreamReply>>) -> Self {
            replies.reverse();
            Self { replies: Mutex::new(replies), seen: Mutex::new(Vec::new()) }
        }

        fn seen(&self) -> Vec<PreparedPayload> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Dispatcher for ScriptedDispatcher {
        async fn dispatch(&self, payload: &PreparedPayload, _family: ModelFamily) -> Result<UpstreamReply> {
            self.seen.lock().unwrap().push(payload.clone());
            self.replies.lock().unwrap().pop().unwrap_or_else(|| {
                Err(BridgeError::Upstream { status: 500, message: "script exhausted".into() })
            })
        }

        async fn dispatch_stream(&self, _request: &OutboundRequest) -> Result<ByteStream> {
            Err(BridgeError::Http("not scripted".into()))
        }
    }

    fn base() -> OutboundRequest {
        let body = json!({"user": "u", "model": "m", "messages": [{"role": "user", "content": "weather?"}]});
        OutboundRequest { environment: Environment::Prod, body: body.as_object().unwrap().clone() }
    }

    fn tools() -> ToolRequest {
        ToolRequest {
            tools: vec![Tool::new("get_weather", "", json!({"type": "object", "properties": {}}))],
            choice: ToolChoice::Auto,
            force_prompt_mode: false,
        }
    }

    fn selector() -> StrategySelector {
        StrategySelector::new(FormatConverter::default(), false)
    }

    #[test]
    fn test_initial_strategy() {
        let tools = tools();
        assert_eq!(selector().initial(ModelFamily::OpenAI, &tools), Strategy::Native);
        assert_eq!(selector().initial(ModelFamily::Anthropic, &tools), Strategy::Native);
        assert_eq!(selector().initial(ModelFamily::Google, &tools), Strategy::PromptBased);
        assert_eq!(selector().initial(ModelFamily::Unknown, &tools), Strategy::PromptBased);
        let forced = StrategySelector::new(FormatConverter::default(), true);
        assert_eq!(forced.initial(ModelFamily::OpenAI, &tools), Strategy::PromptBased);
    }

    #[test]
    fn test_request_can_force_prompt_mode() {
        let mut request = tools();
        request.force_prompt_mode = true;
        assert_eq!(selector().initial(ModelFamily::OpenAI, &request), Strategy::PromptBased);
        assert_eq!(selector().initial(ModelFamily::Anthropic, &request), Strategy::PromptBased);
    }

    #[tokio::test]
    async fn test_forced_request_skips_native_attempt() {
        let mut request = tools();
        request.force_prompt_mode = true;
        let dispatcher = ScriptedDispatcher::new(vec![Ok(UpstreamReply::Text("ok".into()))]);
        let outcome = selector().execute(&base(), &request, ModelFamily::OpenAI, &dispatcher).await.unwrap();
        assert_eq!(outcome.strategy, Strategy::PromptBased);
        assert!(!outcome.fell_back);
        assert_eq!(outcome.states, vec![StrategyState::PromptBased, StrategyState::Succeeded]);
        let seen = dispatcher.seen();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].body.get("tools").is_none());
    }

    #[test]
    fn test_prompt_payload_does_not_touch_base() {
        let base = base();
        let payload = selector().prepare_prompt(&base, &tools(), ModelFamily::Google);
        let messages = payload.body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], json!("system"));
        assert!(payload.body.get("tools").is_none());
        assert_eq!(base.body["messages"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_native_success() {
        let dispatcher = ScriptedDispatcher::new(vec![Ok(UpstreamReply::Text("hi".into()))]);
        let outcome = selector().execute(&base(), &tools(), ModelFamily::OpenAI, &dispatcher).await.unwrap();
        assert_eq!(outcome.strategy, Strategy::Native);
        assert!(!outcome.fell_back);
        assert_eq!(outcome.states, vec![StrategyState::Native, StrategyState::Succeeded]);
        assert!(dispatcher.seen()[0].body.get("tools").is_some());
    }

    #[tokio::test]
    async fn test_google_goes_straight_to_prompt() {
        let dispatcher = ScriptedDispatcher::new(vec![Ok(UpstreamReply::Text("ok".into()))]);
        let outcome = selector().execute(&base(), &tools(), ModelFamily::Google, &dispatcher).await.unwrap();
        assert_eq!(outcome.strategy, Strategy::PromptBased);
        assert!(!outcome.fell_back);
        assert_eq!(dispatcher.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_schema_rejection_falls_back_once() {
        let dispatcher = ScriptedDispatcher::new(vec![
            Err(BridgeError::ToolSchemaRejected("tools invalid".into())),
            Ok(UpstreamReply::Text("done".into())),
        ]);
        let outcome =
            selector().execute(&base(), &tools(), ModelFamily::Anthropic, &dispatcher).await.unwrap();
        assert!(outcome.fell_back);
        assert_eq!(outcome.strategy, Strategy::PromptBased);
        assert_eq!(
            outcome.states,
            vec![StrategyState::Native, StrategyState::PromptBased, StrategyState::Succeeded]
        );
        let seen = dispatcher.seen();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].strategy, Strategy::PromptBased);
    }

    #[tokio::test]
    async fn test_unsupported_encoding_falls_back_without_native_dispatch() {
        let mut request = tools();
        request.tools[0].parameters = json!({"type": "object", "anyOf": [{}]});
        let dispatcher = ScriptedDispatcher::new(vec![Ok(UpstreamReply::Text("done".into()))]);
        let outcome =
            selector().execute(&base(), &request, ModelFamily::Anthropic, &dispatcher).await.unwrap();
        assert!(outcome.fell_back);
        assert_eq!(dispatcher.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_fallback_is_upstream_error_without_second_retry() {
        let dispatcher = ScriptedDispatcher::new(vec![
            Err(BridgeError::ToolSchemaRejected("tools invalid".into())),
            Err(BridgeError::ToolSchemaRejected("still invalid".into())),
            Ok(UpstreamReply::Text("never reached".into())),
        ]);
        let err = selector().execute(&base(), &tools(), ModelFamily::Anthropic, &dispatcher).await.unwrap_err();
        assert!(matches!(err, BridgeError::Upstream { .. }));
        assert_eq!(dispatcher.seen().len(), 2);
    }

    #[tokio::test]
    async fn test_other_native_errors_do_not_fall_back() {
        let (logs, _guard) = LogBuffer::install();
        let dispatcher = ScriptedDispatcher::new(vec![Err(BridgeError::Upstream {
            status: 429,
            message: "slow down".into(),
        })]);
        let err = selector().execute(&base(), &tools(), ModelFamily::OpenAI, &dispatcher).await.unwrap_err();
        assert!(matches!(err, BridgeError::Upstream { status: 429, .. }));
        assert_eq!(dispatcher.seen().len(), 1);
        assert!(logs.contents().contains("states: [Native, Failed]"), "logs: {}", logs.contents());
        assert_eq!(logs.count(tracing::Level::WARN), 0);
    }
}
