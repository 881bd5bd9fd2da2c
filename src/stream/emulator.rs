//!
//! Emulated streaming of a finished result.
//!
//! The event order is fixed: one role delta, the content deltas, one tool-call
//! delta per call in call order, then one final delta. Content goes out in a
//! single delta unless it is longer than the configured threshold, in which
//! case it is split at whitespace. Chunks always concatenate back to the exact
//! original text, and tool-call argument fragments to the exact JSON.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use super::{DeltaEvent, DeltaSink, EmitOutcome, SinkState};
use crate::config::StreamingConfig;
use crate::tools::TranslationResult;

/* --- types ----------------------------------------------------------------------------------- */

///
/// Turns a [`TranslationResult`] into ordered delta events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamEmulator {
    /** content longer than this (bytes) is split */
    content_chunk_threshold: usize,
    /** target size (bytes) of split content chunks */
    content_chunk_size: usize,
    /** argument fragment size in chars; 0 keeps arguments whole */
    argument_chunk_size: usize,
}

/* --- start of code -------------------------------------------------------------------------- */

impl StreamEmulator {
    pub fn new(config: &StreamingConfig) -> Self {
        Self {
            content_chunk_threshold: config.content_chunk_threshold,
            content_chunk_size: config.content_chunk_size.max(1),
            argument_chunk_size: config.argument_chunk_size,
        }
    }

    ///
    /// Builds the complete event sequence for a result.
    ///
    /// # Arguments
    ///  * `result` - finished translation result
    ///
    /// # Returns
    ///  * `Role`, `Content`*, `ToolCall` (index 0..k-1), `Final`
    pub fn events(&self, result: &TranslationResult) -> Vec<DeltaEvent> {
        let mut events = Vec::with_capacity(result.calls.len() + 3);
        events.push(DeltaEvent::Role);
        events.extend(self.split_content(&result.content).into_iter().map(DeltaEvent::Content));
        for (index, call) in result.calls.iter().enumerate() {
            events.push(DeltaEvent::ToolCall {
                index,
                id: call.id.clone(),
                name: call.name.clone(),
                argument_chunks: self.split_arguments(&call.arguments),
            });
        }
        events.push(DeltaEvent::Final(result.finish_reason));
        events
    }

    ///
    /// Writes the event sequence to a sink, stopping as soon as it closes.
    ///
    /// # Returns
    ///  * `Completed`, or `Cancelled` with the number of delivered events; a
    ///    cancelled emission never delivers the final delta
    pub async fn emit<S: DeltaSink + ?Sized>(&self, result: &TranslationResult, sink: &mut S) -> EmitOutcome {
        let mut delivered = 0;
        for event in self.events(result) {
            if sink.send(event).await == SinkState::Closed {
                tracing::debug!("Stream consumer went away after {} events", delivered);
                return EmitOutcome::Cancelled { delivered };
            }
            delivered += 1;
        }
        EmitOutcome::Completed
    }

    fn split_content(&self, content: &str) -> Vec<String> {
        if content.is_empty() {
            return Vec::new();
        }
        if content.len() <= self.content_chunk_threshold {
            return vec![content.to_string()];
        }

        let mut chunks = Vec::new();
        let mut current = String::new();
        for piece in content.split_inclusive(char::is_whitespace) {
            if !current.is_empty() && current.len() + piece.len() > self.content_chunk_size {
                chunks.push(std::mem::take(&mut current));
            }
            current.push_str(piece);
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }

    fn split_arguments(&self, arguments: &str) -> Vec<String> {
        if self.argument_chunk_size == 0 || arguments.chars().count() <= self.argument_chunk_size {
            return vec![arguments.to_string()];
        }
        let chars: Vec<char> = arguments.chars().collect();
        chars.chunks(self.argument_chunk_size).map(|c| c.iter().collect()).collect()
    }
}

impl Default for StreamEmulator {
    fn default() -> Self {
        Self::new(&StreamingConfig::default())
    }
}

/* --- tests ----------------------------------------------------------------------------------- */
