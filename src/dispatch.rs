//!
//! Upstream dispatch.
//!
//! The translation core only sees the [`Dispatcher`] trait: send a prepared
//! payload to an upstream model and get back either the complete response or
//! a raw byte stream. [`HttpDispatcher`] is the production implementation,
//! posting to the chat gateway with `reqwest`.
//!
//! Upstream error bodies are logged in full but never returned to clients;
//! a 400 that complains about tool definitions is reported as
//! `ToolSchemaRejected` so the strategy selector can fall back.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::Client;
use serde_json::{Map, Value};

use crate::config::UpstreamConfig;
use crate::error::{BridgeError, Result};
use crate::logging::{DEFAULT_LOG_TRUNCATION, truncate_for_log};
use crate::provider::Environment;
use crate::tools::ModelFamily;
use crate::tools::strategy::Strategy;

/* --- constants ------------------------------------------------------------------------------- */

/** Content type header for JSON requests */
const CONTENT_TYPE_JSON: &str = "application/json";

/** Longest upstream error body kept in logs */
const MAX_LOGGED_ERROR_BODY: usize = 500;

/** Field paths in a 400 body that point at rejected tool definitions */
const TOOL_REJECTION_MARKERS: [&str; 9] = [
    "tools[",
    "tools.",
    "tools:",
    "'tools'",
    "\"tools\"",
    "tool_choice",
    "input_schema",
    "function.parameters",
    "function_declarations",
];

/* --- types ----------------------------------------------------------------------------------- */

/// Raw upstream bytes for pass-through streaming.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

///
/// Outbound request body before any tool handling, plus its routing.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    /** deployment to send to */
    pub environment: Environment,
    /** `{user, model, messages, system, stop, temperature, ...}` */
    pub body: Map<String, Value>,
}

///
/// Body ready to send, tagged with the strategy that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedPayload {
    pub environment: Environment,
    pub strategy: Strategy,
    pub body: Value,
}

///
/// Complete upstream answer.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamReply {
    /** structured response object (content, tool calls, stop reason) */
    Structured(Value),
    /** plain model text */
    Text(String),
}

///
/// Sends prepared payloads upstream.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    ///
    /// Sends a payload and waits for the complete response.
    ///
    /// # Arguments
    ///  * `payload` - prepared body
    ///  * `family` - family of the target model
    ///
    /// # Returns
    ///  * the reply, `ToolSchemaRejected` when the upstream refused the tool
    ///    definitions, or `Upstream` for other failures
    async fn dispatch(&self, payload: &PreparedPayload, family: ModelFamily) -> Result<UpstreamReply>;

    ///
    /// Opens a genuinely incremental text stream for a tool-free request.
    async fn dispatch_stream(&self, request: &OutboundRequest) -> Result<ByteStream>;
}

///
/// `reqwest`-backed dispatcher for the chat gateway.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    /** HTTP client for upstream requests */
    client: Client,
    /** upstream endpoints */
    upstream: UpstreamConfig,
}

/* --- start of code -------------------------------------------------------------------------- */

impl UpstreamReply {
    /// Reply as a JSON value; text becomes a JSON string.
    pub fn into_value(self) -> Value {
        match self {
            UpstreamReply::Structured(value) => value,
            UpstreamReply::Text(text) => Value::String(text),
        }
    }

    ///
    /// Unwraps the gateway's `{"response": ...}` envelope.
    ///
    /// A string inside the envelope is model text; anything else is kept as a
    /// structured response.
    pub fn from_gateway_body(body: Value) -> Self {
        match body {
            Value::Object(mut map) if map.contains_key("response") => {
                match map.remove("response").unwrap_or(Value::Null) {
                    Value::String(text) => UpstreamReply::Text(text),
                    Value::Null => UpstreamReply::Text(String::new()),
                    other => UpstreamReply::Structured(other),
                }
            }
            Value::String(text) => UpstreamReply::Text(text),
            other => UpstreamReply::Structured(other),
        }
    }
}

impl HttpDispatcher {
    ///
    /// Create dispatcher with an HTTP client honouring the upstream timeout.
    ///
    /// # Arguments
    ///  * `upstream` - upstream endpoint configuration
    ///
    /// # Returns
    ///  * dispatcher, or `BridgeError::Http` if the client cannot be built
    pub fn new(upstream: &UpstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(upstream.timeout_secs))
            .build()
            .map_err(|e| BridgeError::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, upstream: upstream.clone() })
    }

    fn chat_url(&self, environment: Environment) -> &str {
        match environment {
            Environment::Prod => &self.upstream.prod_chat_url,
            Environment::Dev => &self.upstream.dev_chat_url,
        }
    }

    async fn post(&self, url: &str, body: &Value) -> Result<reqwest::Response> {
        tracing::debug!("Upstream request to {}: {}", url, truncate_for_log(&body.to_string(), DEFAULT_LOG_TRUNCATION));
        self.client
            .post(url)
            .header("Content-Type", CONTENT_TYPE_JSON)
            .json(body)
            .send()
            .await
            .map_err(BridgeError::Request)
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn dispatch(&self, payload: &PreparedPayload, family: ModelFamily) -> Result<UpstreamReply> {
        let response = self.post(self.chat_url(payload.environment), &payload.body).await?;
        let status = response.status();
        let text = response.text().await.map_err(BridgeError::Request)?;

        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), &text, family, payload.strategy));
        }
        tracing::debug!("Upstream response: {}", truncate_for_log(&text, DEFAULT_LOG_TRUNCATION));

        Ok(match serde_json::from_str::<Value>(&text) {
            Ok(body) => UpstreamReply::from_gateway_body(body),
            Err(_) => UpstreamReply::Text(text),
        })
    }

    async fn dispatch_stream(&self, request: &OutboundRequest) -> Result<ByteStream> {
        let body = Value::Object(request.body.clone());
        let response = self.post(&self.upstream.stream_url, &body).await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &text, ModelFamily::Unknown, Strategy::Native));
        }
        Ok(response.bytes_stream().map(|chunk| chunk.map_err(BridgeError::Request)).boxed())
    }
}

///
/// Maps a failed upstream status and body to a sanitized error.
///
/// # Arguments
///  * `status` - HTTP status from upstream
///  * `body` - raw response body (logged, never returned)
///  * `family` - family of the target model
///  * `strategy` - strategy of the failed payload; only native payloads can be
///    tool-schema rejections
///
/// # Returns
///  * the error to surface or to fall back on
pub fn classify_failure(status: u16, body: &str, family: ModelFamily, strategy: Strategy) -> BridgeError {
    tracing::error!(
        "Upstream error for {} model ({}): {}",
        family,
        status,
        truncate_for_log(body, MAX_LOGGED_ERROR_BODY)
    );

    let lowered = body.to_ascii_lowercase();
    let message = match status {
        400 if strategy == Strategy::Native
            && TOOL_REJECTION_MARKERS.iter().any(|m| lowered.contains(m)) =>
        {
            return BridgeError::ToolSchemaRejected(truncate_for_log(body, MAX_LOGGED_ERROR_BODY));
        }
        400 => "Upstream rejected the request format.".to_string(),
        401 => "Upstream authentication failed.".to_string(),
        403 => "Access to the upstream model is forbidden.".to_string(),
        404 => "Model or endpoint not found upstream.".to_string(),
        429 => "Too many requests. Please try again later.".to_string(),
        500..=599 => {
            "Upstream model service is temporarily unavailable. Please try again later.".to_string()
        }
        other => format!("Upstream returned status {}.", other),
    };
    BridgeError::Upstream { status, message }
}

/* --- tests ----------------------------------------------------------------------------------- */
