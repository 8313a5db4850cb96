//! Line-framed event stream decoding.
//!
//! The backend streams one record per line.  A record is either empty (a
//! keep-alive separator) or an optional `data:` marker followed by a JSON
//! [`StreamingEvent`].  This module turns a stream of raw body chunks into a
//! stream of decoded events:
//! - [`drain_lines`] -- pull complete lines out of a byte buffer
//! - [`decode_line`] -- one line to at most one event
//! - [`event_stream`] -- build a `BoxStream` from any chunk stream

use futures_core::Stream;
use futures_util::StreamExt;

use sr_domain::error::Result;
use sr_domain::stream::{BoxStream, StreamingEvent};

/// Extract complete lines from `buffer`.
///
/// Consumed bytes are removed; a trailing partial line stays in the buffer
/// for the next call.  Splitting happens on raw bytes so a multi-byte
/// character cut across two chunks is reassembled before decoding.
pub(crate) fn drain_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();

    while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=pos).collect();
        let text = String::from_utf8_lossy(&line[..line.len() - 1]);
        lines.push(text.trim_end_matches('\r').to_string());
    }

    lines
}

/// Decode one record.  Returns `None` for blank lines and for lines that do
/// not hold a valid event; the latter are logged and skipped.
pub(crate) fn decode_line(line: &str) -> Option<StreamingEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let payload = line.strip_prefix("data:").map(str::trim_start).unwrap_or(line);
    if payload.is_empty() {
        return None;
    }

    match serde_json::from_str::<StreamingEvent>(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(error = %e, line = %payload, "skipping undecodable stream record");
            None
        }
    }
}

/// Build a [`BoxStream`] of events from a stream of body chunks.
///
/// The stream:
/// 1. Buffers incoming chunks and decodes every complete line
/// 2. Flushes an unterminated last line when the body closes
/// 3. Yields a transport error once and stops
pub fn event_stream<S, B>(chunks: S) -> BoxStream<'static, Result<StreamingEvent>>
where
    S: Stream<Item = Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut chunks = Box::pin(chunks);
        let mut buffer: Vec<u8> = Vec::new();

        loop {
            match chunks.next().await {
                Some(Ok(bytes)) => {
                    buffer.extend_from_slice(bytes.as_ref());
                    for line in drain_lines(&mut buffer) {
                        if let Some(event) = decode_line(&line) {
                            yield Ok(event);
                        }
                    }
                }
                None => {
                    if !buffer.is_empty() {
                        let rest = String::from_utf8_lossy(&buffer).into_owned();
                        buffer.clear();
                        if let Some(event) = decode_line(&rest) {
                            yield Ok(event);
                        }
                    }
                    break;
                }
                Some(Err(e)) => {
                    yield Err(e);
                    break;
                }
            }
        }
    };

    Box::pin(stream)
}

/// Adapt a streaming `reqwest::Response` body.
pub(crate) fn response_event_stream(
    response: reqwest::Response,
) -> BoxStream<'static, Result<StreamingEvent>> {
    let chunks = response
        .bytes_stream()
        .map(|chunk| chunk.map_err(crate::util::from_reqwest));
    event_stream(chunks)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
