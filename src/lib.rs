//! # ToolBridge - OpenAI-compatible tool calling for a chat gateway
//!
//! Sits between OpenAI-style clients and an upstream chat gateway that serves
//! OpenAI, Anthropic and Google models. Tool definitions are translated into
//! each provider's native format, or embedded in the prompt when a model has
//! no usable native support; tool calls in the answer are extracted and
//! returned in OpenAI form, streamed or not.
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use toolbridge::{Config, create_app};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load()?;
//!     let app = create_app(config)?;
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:7285").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`tools`] - canonical tool model, schema validation, prompt templates,
//!   strategy selection and tool-call extraction
//! - [`converter`] - provider tool formats (OpenAI, Anthropic, Google)
//! - [`stream`] - emulated and pass-through SSE streaming
//! - [`bridge`] - request preparation and completion
//! - [`dispatch`] - upstream transport
//! - [`provider`] - model routing table
//! - [`server`] - HTTP route handlers
//! - [`config`], [`logging`], [`auth`], [`error`] - supporting services

pub mod auth;
pub mod bridge;
pub mod config;
pub mod converter;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod provider;
pub mod server;
pub mod stream;
pub mod tools;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// Re-export commonly used types
pub use config::{Config, ValidationIssue, ValidationSeverity};
pub use dispatch::Dispatcher;
pub use error::BridgeError;

/// Creates the ToolBridge application talking to the configured gateway.
///
/// # Arguments
///
/// * `config` - Application configuration
///
/// # Errors
///
/// Returns a `BridgeError` if the upstream HTTP client cannot be built.
pub fn create_app(config: Config) -> Result<Router, BridgeError> {
    let state = server::AppState::new(config)?;
    Ok(create_router(Arc::new(state)))
}

/// Creates the application around a custom upstream dispatcher.
pub fn create_app_with_dispatcher(config: Config, dispatcher: Arc<dyn Dispatcher>) -> Router {
    create_router(Arc::new(server::AppState::with_dispatcher(config, dispatcher)))
}

/// Routes, including the path aliases older clients use.
fn create_router(state: Arc<server::AppState>) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(server::chat_completions))
        .route("/chat/completions", post(server::chat_completions))
        .route("/api/chat/completions", post(server::chat_completions))
        .route("/v1/models", get(server::models))
        .route("/models", get(server::models))
        .route("/health", get(server::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
