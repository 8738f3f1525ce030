//! Server-Sent Events (SSE) parsing for streaming responses
//!
//! Gemini's `streamGenerateContent?alt=sse` emits one JSON object per line:
//! `data: {"candidates":[{"content":{"parts":[{"text":"..."}]}}]}`.
//! The last object carries `finishReason` and `usageMetadata`.

use super::streaming::StreamChunk;
use super::TokenUsage;
use serde_json::Value;

/// Accumulates raw bytes and yields complete lines.
///
/// Lines are decoded only once complete, so a multi-byte character split
/// across two network chunks is decoded intact.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next complete line without its `\n` or `\r\n` terminator
    pub fn next_line(&mut self) -> Option<String> {
        let newline_pos = self.buf.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.buf.drain(..=newline_pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Take whatever is left after the stream ended without a final newline
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Strip the `data:` field name from an SSE line, if present
pub fn data_payload(line: &str) -> Option<&str> {
    let data = line.strip_prefix("data:")?;
    Some(data.strip_prefix(' ').unwrap_or(data))
}

/// Parse a single SSE line into zero or more StreamChunks.
///
/// A line can carry both a final text delta and the finish marker, so the
/// text (if any) comes first and the terminal chunk second.
pub fn parse_sse_line(line: &str) -> Vec<StreamChunk> {
    let line = line.trim();

    // Skip empty lines, SSE comments and non-data fields
    if line.is_empty() || line.starts_with(':') {
        return Vec::new();
    }
    let Some(data) = data_payload(line) else {
        return Vec::new();
    };
    if data.trim() == "[DONE]" {
        return vec![StreamChunk::Done(TokenUsage::default())];
    }

    let json: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => return vec![StreamChunk::Error(format!("JSON parse error: {}", e))],
    };

    parse_gemini_payload(&json)
}

fn parse_gemini_payload(json: &Value) -> Vec<StreamChunk> {
    let mut chunks = Vec::new();

    if let Some(message) = json["error"]["message"].as_str() {
        chunks.push(StreamChunk::Error(message.to_string()));
        return chunks;
    }

    if let Some(reason) = json["promptFeedback"]["blockReason"].as_str() {
        chunks.push(StreamChunk::Error(format!("Prompt blocked by provider: {}", reason)));
        return chunks;
    }

    let candidate = &json["candidates"][0];

    if let Some(parts) = candidate["content"]["parts"].as_array() {
        let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
        if !text.is_empty() {
            chunks.push(StreamChunk::TextDelta(text));
        }
    }

    if let Some(reason) = candidate["finishReason"].as_str() {
        match reason {
            "STOP" | "MAX_TOKENS" | "FINISH_REASON_UNSPECIFIED" => {
                chunks.push(StreamChunk::Done(parse_usage(json)));
            }
            other => {
                chunks.push(StreamChunk::Error(format!("Generation stopped: {}", other)));
            }
        }
    }

    chunks
}

fn parse_usage(json: &Value) -> TokenUsage {
    let usage = &json["usageMetadata"];
    TokenUsage::new(
        usage["promptTokenCount"].as_u64().unwrap_or(0) as u32,
        usage["candidatesTokenCount"].as_u64().unwrap_or(0) as u32,
    )
}
