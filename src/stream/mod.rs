//!
//! Streaming delta delivery.
//!
//! Two explicitly distinct modes feed the same client-facing delta protocol:
//!
//! - [`StreamMode::Emulated`] replays an already complete [`TranslationResult`]
//!   as role, content, tool-call and final deltas ([`emulator`]).
//! - [`StreamMode::PassThrough`] re-encodes a genuinely incremental upstream
//!   text stream as content deltas ([`passthrough`]).
//!
//! Deltas are written to a [`DeltaSink`]; a sink that reports `Closed` cancels
//! the emission on the spot.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp
//!
//! [`TranslationResult`]: crate::tools::TranslationResult

/* --- modules --------------------------------------------------------------------------------- */

pub mod chunk;
pub mod emulator;
pub mod passthrough;
pub mod sse;

/* --- uses ------------------------------------------------------------------------------------ */

use async_trait::async_trait;

use crate::tools::FinishReason;

pub use emulator::StreamEmulator;

/* --- types ----------------------------------------------------------------------------------- */

///
/// One incremental update of an assistant message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaEvent {
    /** announces the assistant role; always first */
    Role,
    /** a piece of text content */
    Content(String),
    /** one complete tool call, arguments split into fragments */
    ToolCall { index: usize, id: String, name: String, argument_chunks: Vec<String> },
    /** end of message; always last */
    Final(FinishReason),
}

///
/// How a streaming response is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /** chunked replay of a finished result */
    Emulated,
    /** re-encoding of a live upstream stream */
    PassThrough,
}

///
/// Whether the consumer is still listening after a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    Open,
    Closed,
}

///
/// How an emission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    /** every event, including the final delta, was delivered */
    Completed,
    /** the sink closed; `delivered` events made it out */
    Cancelled { delivered: usize },
    /** the upstream broke off after `delivered` events; no final delta was sent */
    Failed { delivered: usize },
}

///
/// Destination of delta events.
#[async_trait]
pub trait DeltaSink: Send {
    ///
    /// Writes one event.
    ///
    /// # Returns
    ///  * `Closed` if the consumer is gone; the event was not delivered
    async fn send(&mut self, event: DeltaEvent) -> SinkState;
}

/* --- start of code -------------------------------------------------------------------------- */

impl StreamMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamMode::Emulated => "emulated",
            StreamMode::PassThrough => "pass-through",
        }
    }
}

#[async_trait]
impl DeltaSink for Vec<DeltaEvent> {
    async fn send(&mut self, event: DeltaEvent) -> SinkState {
        self.push(event);
        SinkState::Open
    }
}
