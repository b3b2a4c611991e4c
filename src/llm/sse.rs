//! Server-Sent Events decoding for provider responses
//!
//! Both OpenAI and Gemini stream `data: <json>` lines. This decoder buffers
//! bytes across chunk boundaries, splits on newlines, drops comments and
//! non-`data` fields, and deserializes each payload into `T`. OpenAI's
//! `data: [DONE]` sentinel ends the stream.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::de::DeserializeOwned;
use std::pin::Pin;

use crate::llm::core::error::LlmError;

/// Byte stream as produced by `reqwest::Response::bytes_stream`
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

const DONE_SENTINEL: &str = "[DONE]";

enum Line<T> {
    Payload(Result<T, LlmError>),
    Done,
}

/// Decode an SSE byte stream into typed `data:` payloads
pub fn parse_sse_stream<T>(
    byte_stream: ByteStream,
) -> Pin<Box<dyn Stream<Item = Result<T, LlmError>> + Send>>
where
    T: DeserializeOwned + Send + 'static,
{
    let mut buffer: Vec<u8> = Vec::new();
    let mut finished = false;

    let decoded = byte_stream
        .flat_map(move |chunk_result| {
            if finished {
                return stream::iter(Vec::new());
            }

            let chunk = match chunk_result {
                Ok(bytes) => bytes,
                Err(e) => {
                    return stream::iter(vec![Line::Payload(Err(LlmError::StreamError(
                        e.to_string(),
                    )))]);
                }
            };

            // Multi-byte characters may straddle chunks, so split on raw newlines
            // and only decode complete lines.
            buffer.extend_from_slice(&chunk);

            let mut lines = Vec::new();
            while let Some(newline_pos) = buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=newline_pos).collect();
                let line = match std::str::from_utf8(&raw) {
                    Ok(text) => text.trim(),
                    Err(e) => {
                        lines.push(Line::Payload(Err(LlmError::StreamError(format!(
                            "Invalid UTF-8 in stream: {}",
                            e
                        )))));
                        continue;
                    }
                };

                match parse_line::<T>(line) {
                    Some(Line::Done) => {
                        finished = true;
                        lines.push(Line::Done);
                        break;
                    }
                    Some(payload) => lines.push(payload),
                    None => {}
                }
            }

            stream::iter(lines)
        })
        .take_while(|line| futures::future::ready(!matches!(line, Line::Done)))
        .filter_map(|line| {
            futures::future::ready(match line {
                Line::Payload(result) => Some(result),
                Line::Done => None,
            })
        });

    Box::pin(decoded)
}

fn parse_line<T: DeserializeOwned>(line: &str) -> Option<Line<T>> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() {
        return None;
    }
    if data == DONE_SENTINEL {
        return Some(Line::Done);
    }

    Some(Line::Payload(serde_json::from_str::<T>(data).map_err(|e| {
        LlmError::SerializationError(format!("Failed to parse SSE data: {}. Data: {}", e, data))
    })))
}
