//! Wire decoding for provider transports.
//!
//! Two framings cover every backend: newline-delimited JSON (the local
//! runner) and SSE `data:` lines (the hosted chat APIs). Decoding is best
//! effort at this boundary: a malformed line yields `None` and is logged by
//! the caller, it never aborts the stream.

use crate::error::GenError;
use serde_json::Value;
use std::pin::Pin;
use tokio_stream::{Stream, StreamExt};

/// Lines of a streaming HTTP response body, in arrival order.
pub type LineStream = Pin<Box<dyn Stream<Item = Result<String, GenError>> + Send>>;

/// Split a response body into lines as chunks arrive. Buffers only up to the
/// next line terminator, so fragments surface as soon as they are decodable.
pub fn response_lines(response: reqwest::Response) -> LineStream {
    Box::pin(async_stream::stream! {
        let bytes = response.bytes_stream();
        tokio::pin!(bytes);

        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => {
                    buf.extend_from_slice(&chunk);
                    while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                        let raw: Vec<u8> = buf.drain(..=pos).collect();
                        let line = String::from_utf8_lossy(&raw)
                            .trim_end_matches(['\r', '\n'])
                            .to_string();
                        yield Ok(line);
                    }
                }
                Err(e) => {
                    yield Err(GenError::ProviderUnreachable(e.to_string()));
                    return;
                }
            }
        }
        if !buf.is_empty() {
            let line = String::from_utf8_lossy(&buf).trim_end().to_string();
            if !line.is_empty() {
                yield Ok(line);
            }
        }
    })
}

/// Payload of an SSE `data:` line. `None` for comments, event names, blank
/// keep-alive lines and anything else that is not data.
pub fn sse_payload(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("data:")?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// Fragment text of one local-runner NDJSON line (`{"response": ...}`).
pub fn generate_fragment(line: &str) -> Option<String> {
    let value: Value = serde_json::from_str(line).ok()?;
    value
        .get("response")
        .and_then(|r| r.as_str())
        .map(|s| s.to_string())
}

/// Whether a local-runner NDJSON line marks the end of the stream.
pub fn generate_done(line: &str) -> bool {
    serde_json::from_str::<Value>(line)
        .ok()
        .and_then(|v| v.get("done").and_then(|d| d.as_bool()))
        .unwrap_or(false)
}

/// Delta content of one chat-completions stream event.
pub fn chat_delta(payload: &str) -> Option<String> {
    let value: Value = serde_json::from_str(payload).ok()?;
    value
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
        .map(|s| s.to_string())
}

/// Message content of a whole (non-streaming) chat-completions response.
pub fn chat_message(value: &Value) -> Option<String> {
    value
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(|s| s.to_string())
}

/// Concatenated text parts of one generate-content response or stream chunk.
pub fn content_parts(value: &Value) -> Option<String> {
    let parts = value
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    Some(text)
}
