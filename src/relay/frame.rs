//! Event-stream frame codec shared by the relay and its consumers
//!
//! Wire format, one frame per event:
//! - `data: {"content":"<fragment>"}\n\n`
//! - `data: {"error":"<message>"}\n\n`
//! - `data: [DONE]\n\n` (terminal, written exactly once)

use serde::{Deserialize, Serialize};
use serde_json::json;

pub const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Content(String),
    Error(String),
    Done,
}

#[derive(Debug, Deserialize, Serialize)]
struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Frame {
    pub fn encode(&self) -> String {
        match self {
            Frame::Content(text) => format!("data: {}\n\n", json!({ "content": text })),
            Frame::Error(message) => format!("data: {}\n\n", json!({ "error": message })),
            Frame::Done => format!("data: {}\n\n", DONE_MARKER),
        }
    }

    /// Decode one line of an event stream.
    ///
    /// `Ok(None)` for lines that are not data frames (blank separators,
    /// comments, other fields) or carry neither field; `Err` for a data
    /// line whose JSON does not parse.
    pub fn parse_line(line: &str) -> Result<Option<Frame>, serde_json::Error> {
        let Some(data) = crate::api::sse::data_payload(line.trim_end()) else {
            return Ok(None);
        };
        let data = data.trim();
        if data == DONE_MARKER {
            return Ok(Some(Frame::Done));
        }

        let payload: Payload = serde_json::from_str(data)?;
        Ok(match (payload.error, payload.content) {
            (Some(error), _) => Some(Frame::Error(error)),
            (None, Some(content)) => Some(Frame::Content(content)),
            (None, None) => None,
        })
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Frame::Content(_))
    }
}
