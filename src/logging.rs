//!
//! Logging setup and shared log helpers.
//!
//! The subscriber filter starts from `server.log_level` (forced to debug by
//! `server.verbose`) and `RUST_LOG` overrides it. With `server.log_file` set,
//! output is also appended to that file without ANSI colours.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{paths, Config};
use crate::error::{BridgeError, Result};
use crate::tools::{FinishReason, ModelFamily};

/* --- constants ------------------------------------------------------------------------------- */

/// Default length of payload dumps in debug logs
pub const DEFAULT_LOG_TRUNCATION: usize = 500;

const TRUNCATION_SUFFIX: &str = "... (truncated)";

/* --- start of code -------------------------------------------------------------------------- */

///
/// Installs the global tracing subscriber.
///
/// # Arguments
///  * `config` - effective configuration
///
/// # Returns
///  * `Ok(())` once installed
///  * `BridgeError::Config` if the log file cannot be opened or a subscriber is already set
pub fn init_logging(config: &Config) -> Result<()> {
    let level = config.effective_log_level();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let console = tracing_subscriber::fmt::layer().with_target(false);

    let file_layer = match &config.server.log_file {
        Some(log_file) => {
            let path = paths::expand_path(log_file)?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    BridgeError::Config(format!("Failed to create log directory '{}': {}", parent.display(), e))
                })?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&path).map_err(|e| {
                BridgeError::Config(format!("Failed to open log file '{}': {}", path.display(), e))
            })?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file))
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| BridgeError::Config(format!("Failed to initialise logging: {}", e)))
}

///
/// Shortens a payload for debug output, respecting char boundaries.
///
/// # Arguments
///  * `data` - text to log
///  * `max` - maximum number of chars kept
pub fn truncate_for_log(data: &str, max: usize) -> String {
    match data.char_indices().nth(max) {
        Some((cut, _)) => format!("{}{}", &data[..cut], TRUNCATION_SUFFIX),
        None => data.to_string(),
    }
}

pub fn log_request_summary(endpoint: &str, model: &str, has_tools: bool, stream: bool) {
    info!("{} model={} tools={} stream={}", endpoint, model, has_tools, stream);
}

pub fn log_response_summary(status: u16, model: &str, finish_reason: FinishReason) {
    info!("Completed status={} model={} finish_reason={}", status, model, finish_reason.as_str());
}

pub fn log_tool_processing(family: ModelFamily, tool_count: usize, native: bool) {
    debug!(
        "Processing {} tool(s) for {} family via {} calling",
        tool_count,
        family,
        if native { "native" } else { "prompt-based" }
    );
}


/* --- tests ----------------------------------------------------------------------------------- */
