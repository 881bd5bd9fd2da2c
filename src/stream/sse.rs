//!
//! Server-sent-events sink.
//!
//! Encodes delta events as `chat.completion.chunk` JSON and pushes them into a
//! bounded channel drained by the axum `Sse` response. A dropped receiver (the
//! client disconnected) closes the sink.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::convert::Infallible;

use async_trait::async_trait;
use axum::response::sse::Event;
use tokio::sync::mpsc;

use super::chunk::{ChunkEncoder, DONE_MARKER};
use super::{DeltaEvent, DeltaSink, SinkState};

/* --- types ----------------------------------------------------------------------------------- */

/// Channel item type consumed by `Sse::new(ReceiverStream::new(rx))`.
pub type SseItem = std::result::Result<Event, Infallible>;

///
/// Delta sink writing SSE events into an mpsc channel.
pub struct SseSink {
    /** event sender channel */
    tx: mpsc::Sender<SseItem>,
    /** chunk identity */
    encoder: ChunkEncoder,
}

/* --- start of code -------------------------------------------------------------------------- */

impl SseSink {
    pub fn new(tx: mpsc::Sender<SseItem>, encoder: ChunkEncoder) -> Self {
        Self { tx, encoder }
    }

    ///
    /// Sends the terminal `[DONE]` marker.
    pub async fn done(&self) -> SinkState {
        self.send_data(DONE_MARKER.to_string()).await
    }

    async fn send_data(&self, data: String) -> SinkState {
        match self.tx.send(Ok(Event::default().data(data))).await {
            Ok(()) => SinkState::Open,
            Err(_) => SinkState::Closed,
        }
    }
}

#[async_trait]
impl DeltaSink for SseSink {
    async fn send(&mut self, event: DeltaEvent) -> SinkState {
        for chunk in self.encoder.encode(&event) {
            let data = match serde_json::to_string(&chunk) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to serialize chunk: {}", e);
                    continue;
                }
            };
            if self.send_data(data).await == SinkState::Closed {
                return SinkState::Closed;
            }
        }
        SinkState::Open
    }
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::FinishReason;

    #[tokio::test]
    async fn test_closed_receiver_closes_sink() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let mut sink = SseSink::new(tx, ChunkEncoder::new("id", 0, "m"));
        assert_eq!(sink.send(DeltaEvent::Role).await, SinkState::Closed);
    }

    #[tokio::test]
    async fn test_open_receiver_gets_one_event_per_chunk() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut sink = SseSink::new(tx, ChunkEncoder::new("id", 0, "m"));
        let event = DeltaEvent::ToolCall {
            index: 0,
            id: "c".into(),
            name: "t".into(),
            argument_chunks: vec!["{".into(), "}".into()],
        };
        assert_eq!(sink.send(event).await, SinkState::Open);
        assert_eq!(sink.send(DeltaEvent::Final(FinishReason::ToolCalls)).await, SinkState::Open);
        assert_eq!(sink.done().await, SinkState::Open);
        drop(sink);
        let mut count = 0;
        while rx.recv().await.is_some() {
            count += 1;
        }
        assert_eq!(count, 4);
    }
}
