//!
//! HTTP server implementation for the OpenAI-compatible tool-calling bridge.
//!
//! Accepts chat completion requests, runs them through the [`ChatBridge`] and
//! answers with a `chat.completion` object or an SSE stream of
//! `chat.completion.chunk` deltas. Tool requests and models the upstream
//! cannot stream are answered with emulated streaming; tool-free requests to
//! streaming-capable models are forwarded live.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response, Sse};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::auth::user_from_headers;
use crate::bridge::{ChatBridge, ChatCompletion, ChatExchange, ChatRequest, completion_id};
use crate::config::Config;
use crate::dispatch::{Dispatcher, HttpDispatcher};
use crate::error::{BridgeError, Result, ValidationError, ValidationErrorKind};
use crate::logging::{log_request_summary, log_response_summary};
use crate::provider::ModelRegistry;
use crate::stream::chunk::ChunkEncoder;
use crate::stream::sse::{SseItem, SseSink};
use crate::stream::{EmitOutcome, StreamEmulator, StreamMode, passthrough};
use crate::tools::TranslationResult;

/* --- types ----------------------------------------------------------------------------------- */

///
/// Application state shared by all handlers.
pub struct AppState {
    /** application configuration */
    pub config: Config,
    /** request preparation and tool translation */
    pub bridge: ChatBridge,
    /** upstream transport */
    pub dispatcher: Arc<dyn Dispatcher>,
    /** finished-result streaming */
    pub emulator: StreamEmulator,
    /** metrics for monitoring */
    pub metrics: AppMetrics,
}

///
/// Application metrics for monitoring and observability.
#[derive(Debug, Default)]
pub struct AppMetrics {
    /** total number of requests processed */
    pub total_requests: AtomicU64,
    /** total number of successful requests */
    pub successful_requests: AtomicU64,
    /** total number of failed requests */
    pub failed_requests: AtomicU64,
    /** requests carrying tool definitions */
    pub tool_requests: AtomicU64,
    /** native attempts that fell back to prompt-based tools */
    pub strategy_fallbacks: AtomicU64,
    /** SSE responses started */
    pub streamed_responses: AtomicU64,
    /** SSE responses abandoned by the client */
    pub cancelled_streams: AtomicU64,
    /** SSE responses cut short by an upstream failure */
    pub failed_streams: AtomicU64,
}

/* --- start of code -------------------------------------------------------------------------- */

impl AppState {
    ///
    /// Create application state talking to the configured upstream gateway.
    ///
    /// # Arguments
    ///  * `config` - application configuration
    ///
    /// # Returns
    ///  * state, or `BridgeError::Http` if the HTTP client cannot be built
    pub fn new(config: Config) -> Result<Self> {
        let dispatcher = Arc::new(HttpDispatcher::new(&config.upstream)?);
        Ok(Self::with_dispatcher(config, dispatcher))
    }

    ///
    /// Create application state around any dispatcher.
    pub fn with_dispatcher(config: Config, dispatcher: Arc<dyn Dispatcher>) -> Self {
        let bridge = ChatBridge::new(&config, ModelRegistry::builtin());
        let emulator = StreamEmulator::new(&config.streaming);
        Self { config, bridge, dispatcher, emulator, metrics: AppMetrics::default() }
    }
}

///
/// Handle chat completion requests.
///
/// # Arguments
///  * `state` - shared application state
///  * `uri` - request path, for logging
///  * `headers` - request headers carrying the bearer user
///  * `body` - JSON request body
///
/// # Returns
///  * completion JSON, an SSE stream, or an OpenAI-style error body
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Response {
    state.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

    let outcome = match body {
        Ok(Json(body)) => process_chat_completion(state.clone(), uri.path(), &headers, body).await,
        Err(rejection) => Err(BridgeError::Validation(ValidationError::new(
            ValidationErrorKind::MissingField,
            "body",
            rejection.body_text(),
        ))),
    };

    match outcome {
        Ok(response) => {
            state.metrics.successful_requests.fetch_add(1, Ordering::Relaxed);
            response
        }
        Err(e) => {
            state.metrics.failed_requests.fetch_add(1, Ordering::Relaxed);
            create_error_response(&e)
        }
    }
}

async fn process_chat_completion(
    state: Arc<AppState>,
    endpoint: &str,
    headers: &HeaderMap,
    body: Value,
) -> Result<Response> {
    let request = ChatRequest::from_value(body)?;
    let user = user_from_headers(headers, &state.config.server.default_user);
    let exchange = state.bridge.prepare(request, &user)?;

    log_request_summary(endpoint, &exchange.model, exchange.tools.is_some(), exchange.stream);
    if exchange.tools.is_some() {
        state.metrics.tool_requests.fetch_add(1, Ordering::Relaxed);
    }

    if exchange.stream && exchange.stream_mode() == StreamMode::PassThrough {
        return handle_passthrough_stream(state, exchange).await;
    }

    let completion = state.bridge.complete(&exchange, state.dispatcher.as_ref()).await?;
    if completion.fell_back {
        state.metrics.strategy_fallbacks.fetch_add(1, Ordering::Relaxed);
    }
    log_response_summary(200, &exchange.model, completion.result.finish_reason);

    if exchange.stream {
        return Ok(handle_emulated_stream(state, exchange.model, completion.result));
    }

    let response = ChatCompletion::from_result(
        completion_id(),
        chrono::Utc::now().timestamp(),
        exchange.model,
        &completion.result,
    );
    Ok(Json(response).into_response())
}

///
/// Replays a finished result as SSE deltas from a background task.
fn handle_emulated_stream(state: Arc<AppState>, model: String, result: TranslationResult) -> Response {
    let (tx, rx) = open_stream(&state);
    let encoder = ChunkEncoder::new(completion_id(), chrono::Utc::now().timestamp(), model);
    tracing::debug!("Emulating stream: {} call(s), {} content bytes", result.calls.len(), result.content.len());

    tokio::spawn(async move {
        let mut sink = SseSink::new(tx, encoder);
        let outcome = state.emulator.emit(&result, &mut sink).await;
        finish_stream(&state, &sink, outcome).await;
    });

    Sse::new(ReceiverStream::new(rx)).into_response()
}

///
/// Forwards the upstream text stream as SSE deltas.
async fn handle_passthrough_stream(state: Arc<AppState>, exchange: ChatExchange) -> Result<Response> {
    let upstream = state.dispatcher.dispatch_stream(&exchange.outbound).await?;
    let (tx, rx) = open_stream(&state);
    let encoder = ChunkEncoder::new(completion_id(), chrono::Utc::now().timestamp(), exchange.model);
    tracing::debug!("Passing through upstream stream for {}", exchange.route.upstream_id);

    tokio::spawn(async move {
        let mut sink = SseSink::new(tx, encoder);
        let outcome = passthrough::forward(upstream, &mut sink).await;
        finish_stream(&state, &sink, outcome).await;
    });

    Ok(Sse::new(ReceiverStream::new(rx)).into_response())
}

fn open_stream(state: &AppState) -> (mpsc::Sender<SseItem>, mpsc::Receiver<SseItem>) {
    state.metrics.streamed_responses.fetch_add(1, Ordering::Relaxed);
    mpsc::channel::<SseItem>(state.config.streaming.channel_capacity.max(1))
}

/// `[DONE]` only follows a completed emission.
async fn finish_stream(state: &AppState, sink: &SseSink, outcome: EmitOutcome) {
    match outcome {
        EmitOutcome::Completed => {
            sink.done().await;
        }
        EmitOutcome::Cancelled { delivered } => {
            state.metrics.cancelled_streams.fetch_add(1, Ordering::Relaxed);
            tracing::info!("Client disconnected after {} stream events", delivered);
        }
        EmitOutcome::Failed { delivered } => {
            state.metrics.failed_streams.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Stream closed without [DONE] after {} events: upstream failed", delivered);
        }
    }
}

///
/// Create an OpenAI-style error response.
///
/// # Arguments
///  * `error` - error to convert to HTTP response
///
/// # Returns
///  * HTTP error response with `{"error": {message, type, param, code}}`
fn create_error_response(error: &BridgeError) -> Response {
    let status = StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);
    if status.is_server_error() {
        tracing::error!("Request failed ({}): {}", status.as_u16(), error);
    } else {
        tracing::warn!("Request rejected ({}): {}", status.as_u16(), error);
    }

    let code = match error {
        BridgeError::Validation(v) => Some(v.kind.as_str()),
        BridgeError::UnknownModel(_) => Some("model_not_found"),
        _ => None,
    };

    let error_response = json!({
      "error": {
        "message": error.public_message(),
        "type": error.error_type(),
        "param": error.param(),
        "code": code
      }
    });

    (status, Json(error_response)).into_response()
}

///
/// Handle models listing endpoint.
///
/// # Arguments
///  * `state` - shared application state
///
/// # Returns
///  * JSON list of upstream model ids
pub async fn models(State(state): State<Arc<AppState>>) -> Json<Value> {
    let created = chrono::Utc::now().timestamp();
    let data: Vec<Value> = state
        .bridge
        .registry()
        .upstream_ids()
        .iter()
        .map(|id| json!({"id": id, "object": "model", "created": created, "owned_by": "system"}))
        .collect();

    Json(json!({"object": "list", "data": data}))
}

///
/// Handle health check endpoint.
///
/// # Arguments
///  * `state` - shared application state with metrics
///
/// # Returns
///  * JSON response with health status and metrics
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let metrics = &state.metrics;
    let total_requests = metrics.total_requests.load(Ordering::Relaxed);
    let successful_requests = metrics.successful_requests.load(Ordering::Relaxed);

    Json(json!({
      "status": "ok",
      "version": env!("CARGO_PKG_VERSION"),
      "metrics": {
        "total_requests": total_requests,
        "successful_requests": successful_requests,
        "failed_requests": metrics.failed_requests.load(Ordering::Relaxed),
        "tool_requests": metrics.tool_requests.load(Ordering::Relaxed),
        "strategy_fallbacks": metrics.strategy_fallbacks.load(Ordering::Relaxed),
        "streamed_responses": metrics.streamed_responses.load(Ordering::Relaxed),
        "cancelled_streams": metrics.cancelled_streams.load(Ordering::Relaxed),
        "failed_streams": metrics.failed_streams.load(Ordering::Relaxed),
        "success_rate": if total_requests > 0 {
          (successful_requests as f64 / total_requests as f64 * 100.0).round()
        } else {
          100.0
        }
      }
    }))
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_error_body() {
        let error = BridgeError::Validation(ValidationError::new(
            ValidationErrorKind::DuplicateToolName,
            "tools[1].function.name",
            "duplicate tool name 'get_weather'",
        ));
        let response = create_error_response(&error);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["type"], json!("invalid_request_error"));
        assert_eq!(body["error"]["param"], json!("tools[1].function.name"));
        assert_eq!(body["error"]["code"], json!("duplicate_tool_name"));
    }

    #[tokio::test]
    async fn test_upstream_error_keeps_status() {
        let error = BridgeError::Upstream { status: 503, message: "unavailable".into() };
        let response = create_error_response(&error);
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], json!("unavailable"));
        assert_eq!(body["error"]["code"], Value::Null);
    }
}
