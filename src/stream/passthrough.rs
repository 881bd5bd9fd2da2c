//!
//! Pass-through streaming of a live upstream text stream.
//!
//! Every upstream byte chunk becomes one content delta, framed by a role delta
//! and a final `stop` delta. Multi-byte UTF-8 sequences split across chunks
//! are held back until complete. An upstream that breaks off mid-stream gets
//! no final delta, so the client never sees a truncated answer as `stop`.
//! Tool calls never travel this path.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use futures::StreamExt;

use super::{DeltaEvent, DeltaSink, EmitOutcome, SinkState};
use crate::dispatch::ByteStream;
use crate::tools::FinishReason;

/* --- start of code -------------------------------------------------------------------------- */

///
/// Forwards an upstream byte stream to a sink as content deltas.
///
/// # Arguments
///  * `upstream` - raw text chunks from the streaming endpoint
///  * `sink` - delta destination
///
/// # Returns
///  * `Completed` once the final delta is delivered, `Cancelled` if the sink
///    closed first, `Failed` if the upstream errored before its end
pub async fn forward<S: DeltaSink + ?Sized>(mut upstream: ByteStream, sink: &mut S) -> EmitOutcome {
    let mut delivered = 0;
    if sink.send(DeltaEvent::Role).await == SinkState::Closed {
        return EmitOutcome::Cancelled { delivered };
    }
    delivered += 1;

    let mut pending: Vec<u8> = Vec::new();
    while let Some(chunk) = upstream.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("Upstream stream failed after {} events: {}", delivered, e);
                return EmitOutcome::Failed { delivered };
            }
        };
        pending.extend_from_slice(&bytes);
        let text = take_complete_utf8(&mut pending);
        if text.is_empty() {
            continue;
        }
        if sink.send(DeltaEvent::Content(text)).await == SinkState::Closed {
            return EmitOutcome::Cancelled { delivered };
        }
        delivered += 1;
    }

    if !pending.is_empty() {
        let rest = String::from_utf8_lossy(&pending).into_owned();
        if sink.send(DeltaEvent::Content(rest)).await == SinkState::Closed {
            return EmitOutcome::Cancelled { delivered };
        }
        delivered += 1;
    }

    if sink.send(DeltaEvent::Final(FinishReason::Stop)).await == SinkState::Closed {
        return EmitOutcome::Cancelled { delivered };
    }
    EmitOutcome::Completed
}

/// Drains the longest decodable prefix; an incomplete trailing sequence stays pending.
fn take_complete_utf8(pending: &mut Vec<u8>) -> String {
    let valid = match std::str::from_utf8(pending) {
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        _ => pending.len(),
    };
    let tail = pending.split_off(valid);
    let text = String::from_utf8_lossy(pending).into_owned();
    *pending = tail;
    text
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use bytes::Bytes;
    use futures::stream;

    fn upstream(chunks: Vec<&'static [u8]>) -> ByteStream {
        stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from_static(c)))).boxed()
    }

    #[tokio::test]
    async fn test_forward_frames_content() {
        let mut sink: Vec<DeltaEvent> = Vec::new();
        let outcome = forward(upstream(vec![&b"Hel"[..], &b"lo"[..]]), &mut sink).await;
        assert_eq!(outcome, EmitOutcome::Completed);
        assert_eq!(
            sink,
            vec![
                DeltaEvent::Role,
                DeltaEvent::Content("Hel".into()),
                DeltaEvent::Content("lo".into()),
                DeltaEvent::Final(FinishReason::Stop),
            ]
        );
    }

    #[tokio::test]
    async fn test_split_multibyte_character() {
        let bytes = "é".as_bytes();
        let (a, b): (&'static [u8], &'static [u8]) = (&[0xC3], &[0xA9]);
        assert_eq!(bytes, [a, b].concat().as_slice());
        let mut sink: Vec<DeltaEvent> = Vec::new();
        forward(upstream(vec![&b"caf"[..], a, b]), &mut sink).await;
        let text: String = sink
            .iter()
            .filter_map(|e| match e {
                DeltaEvent::Content(c) => Some(c.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "café");
    }

    #[tokio::test]
    async fn test_upstream_error_skips_final_delta() {
        let failing: ByteStream = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(BridgeError::Http("reset".into())),
            Ok(Bytes::from_static(b"never read")),
        ])
        .boxed();
        let mut sink: Vec<DeltaEvent> = Vec::new();
        let outcome = forward(failing, &mut sink).await;
        assert_eq!(outcome, EmitOutcome::Failed { delivered: 2 });
        assert_eq!(sink, vec![DeltaEvent::Role, DeltaEvent::Content("partial".into())]);
    }
}
