//! Consumer side of the relay's streaming responses
//!
//! [`consume`] reads an event-framed body, [`consume_raw`] a raw-chunk body.
//! Both hand every fragment to a callback as it arrives and return the
//! accumulated answer once the stream settles.

mod http;

pub use http::{ClientError, RelayClient};

use crate::api::sse::LineBuffer;
use crate::relay::frame::Frame;
use bytes::Bytes;
use futures_util::{pin_mut, Stream, StreamExt};
use std::fmt::Display;
use tracing::{debug, warn};

/// Incremental decoder for event-framed bodies
#[derive(Debug, Default)]
pub struct EventParser {
    lines: LineBuffer,
    skipped: usize,
}

impl EventParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk and return the frames it completed.
    ///
    /// A trailing partial line stays buffered until the next chunk.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Frame> {
        self.lines.push(bytes);
        let mut frames = Vec::new();
        while let Some(line) = self.lines.next_line() {
            if let Some(frame) = self.decode(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Decode whatever is left once the body has ended
    pub fn finish(&mut self) -> Option<Frame> {
        let line = self.lines.take_remainder()?;
        self.decode(&line)
    }

    /// Data lines that were dropped because their JSON did not parse
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn decode(&mut self, line: &str) -> Option<Frame> {
        match Frame::parse_line(line) {
            Ok(frame) => frame,
            Err(e) => {
                self.skipped += 1;
                debug!("Skipping malformed frame: {}", e);
                None
            }
        }
    }
}

/// Answer text built from fragments; append-only until sealed
#[derive(Debug, Default, Clone)]
pub struct AccumulatedAnswer {
    text: String,
    sealed: bool,
}

impl AccumulatedAnswer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment; returns false once the answer is sealed
    pub fn append(&mut self, fragment: &str) -> bool {
        if self.sealed {
            return false;
        }
        self.text.push_str(fragment);
        true
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// How a streamed answer ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Terminal marker received with no error
    Answer(String),
    /// The relay reported an error; `partial` holds what arrived before it
    Error { message: String, partial: String },
    /// The body ended or failed without a terminal marker
    Interrupted { partial: String },
}

impl Outcome {
    /// Whatever text was received, complete or not
    pub fn text(&self) -> &str {
        match self {
            Outcome::Answer(text) => text,
            Outcome::Error { partial, .. } | Outcome::Interrupted { partial } => partial,
        }
    }

    pub fn is_answer(&self) -> bool {
        matches!(self, Outcome::Answer(_))
    }
}

/// Read an event-framed body to its end.
///
/// Stops at the first error frame or `[DONE]`; anything after them is not
/// read. Dropping the returned future drops the body.
pub async fn consume<S, E, F>(stream: S, mut on_fragment: F) -> Outcome
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
    F: FnMut(&str),
{
    pin_mut!(stream);
    let mut parser = EventParser::new();
    let mut answer = AccumulatedAnswer::new();

    let mut apply = |frame: Frame, answer: &mut AccumulatedAnswer| -> Option<Outcome> {
        match frame {
            Frame::Content(text) => {
                if answer.append(&text) {
                    on_fragment(&text);
                }
                None
            }
            Frame::Error(message) => {
                answer.seal();
                Some(Outcome::Error {
                    message,
                    partial: answer.as_str().to_string(),
                })
            }
            Frame::Done => {
                answer.seal();
                Some(Outcome::Answer(answer.as_str().to_string()))
            }
        }
    };

    while let Some(item) = stream.next().await {
        match item {
            Ok(bytes) => {
                for frame in parser.feed(&bytes) {
                    if let Some(outcome) = apply(frame, &mut answer) {
                        return outcome;
                    }
                }
            }
            Err(e) => {
                warn!("Relay stream failed: {}", e);
                return Outcome::Interrupted {
                    partial: answer.into_string(),
                };
            }
        }
    }

    if let Some(frame) = parser.finish() {
        if let Some(outcome) = apply(frame, &mut answer) {
            return outcome;
        }
    }
    if parser.skipped() > 0 {
        debug!("{} malformed frames skipped", parser.skipped());
    }

    Outcome::Interrupted {
        partial: answer.into_string(),
    }
}

/// Read a raw-chunk body: every chunk is a fragment, a clean end is the
/// answer and a transport error means the relay aborted the stream.
pub async fn consume_raw<S, E, F>(stream: S, mut on_fragment: F) -> Outcome
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
    F: FnMut(&str),
{
    pin_mut!(stream);
    let mut answer = AccumulatedAnswer::new();
    // Bytes of a character split across chunks
    let mut pending: Vec<u8> = Vec::new();

    while let Some(item) = stream.next().await {
        match item {
            Ok(bytes) => {
                pending.extend_from_slice(&bytes);
                let valid = match std::str::from_utf8(&pending) {
                    Ok(_) => pending.len(),
                    Err(e) if e.error_len().is_none() => e.valid_up_to(),
                    Err(_) => pending.len(),
                };
                let text = String::from_utf8_lossy(&pending[..valid]).into_owned();
                pending.drain(..valid);
                if !text.is_empty() && answer.append(&text) {
                    on_fragment(&text);
                }
            }
            Err(e) => {
                warn!("Raw relay stream aborted: {}", e);
                return Outcome::Interrupted {
                    partial: answer.into_string(),
                };
            }
        }
    }

    if !pending.is_empty() {
        let text = String::from_utf8_lossy(&pending).into_owned();
        answer.append(&text);
        on_fragment(&text);
    }
    answer.seal();
    Outcome::Answer(answer.into_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::io;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Bytes, io::Error>> {
        let items: Vec<Result<Bytes, io::Error>> = parts
            .iter()
            .map(|p| Ok(Bytes::from(p.to_string())))
            .collect();
        stream::iter(items)
    }

    #[test]
    fn test_parser_keeps_partial_lines() {
        let mut parser = EventParser::new();
        assert!(parser.feed(b"data: {\"cont").is_empty());
        let frames = parser.feed(b"ent\":\"hi\"}\n\ndata: [DONE]\r\n");
        assert_eq!(frames, vec![Frame::Content("hi".into()), Frame::Done]);
    }

    #[test]
    fn test_parser_skips_malformed() {
        let mut parser = EventParser::new();
        let frames =
            parser.feed(b"data: {not json}\n: comment\nevent: ping\ndata: {\"other\":1}\n");
        assert!(frames.is_empty());
        assert_eq!(parser.skipped(), 1);
    }

    #[test]
    fn test_parser_finish_decodes_remainder() {
        let mut parser = EventParser::new();
        assert!(parser.feed(b"data: [DONE]").is_empty());
        assert_eq!(parser.finish(), Some(Frame::Done));
        assert_eq!(parser.finish(), None);
    }

    #[test]
    fn test_answer_rejects_after_seal() {
        let mut answer = AccumulatedAnswer::new();
        assert!(answer.append("a"));
        answer.seal();
        assert!(!answer.append("b"));
        assert!(answer.is_sealed());
        assert_eq!(answer.as_str(), "a");
    }

    #[tokio::test]
    async fn test_consume_concatenates_fragments() {
        let body = chunks(&[
            "data: {\"content\":\"Hel\"}\n\n",
            "data: {\"content\":\"lo\"}\n\ndata: [DONE]\n\n",
        ]);
        let mut seen = Vec::new();
        let outcome = consume(body, |f| seen.push(f.to_string())).await;
        assert_eq!(outcome, Outcome::Answer("Hello".into()));
        assert_eq!(seen, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_consume_continues_after_malformed_frame() {
        let body = chunks(&[
            "data: {bad\n\n",
            "data: {\"content\":\"later\"}\n\n",
            "data: [DONE]\n\n",
        ]);
        let mut seen = Vec::new();
        let outcome = consume(body, |f| seen.push(f.to_string())).await;
        assert_eq!(outcome, Outcome::Answer("later".into()));
        assert_eq!(seen, vec!["later"]);
    }

    #[tokio::test]
    async fn test_consume_error_keeps_partial() {
        let body = chunks(&[
            "data: {\"content\":\"f1\"}\n\ndata: {\"content\":\"f2\"}\n\n",
            "data: {\"error\":\"quota\"}\n\ndata: [DONE]\n\n",
        ]);
        let outcome = consume(body, |_| {}).await;
        assert_eq!(
            outcome,
            Outcome::Error {
                message: "quota".into(),
                partial: "f1f2".into()
            }
        );
    }

    #[tokio::test]
    async fn test_consume_ignores_frames_after_done() {
        let body = chunks(&["data: [DONE]\n\ndata: {\"content\":\"late\"}\n\n"]);
        let outcome = consume(body, |_| panic!("no fragment expected")).await;
        assert_eq!(outcome, Outcome::Answer(String::new()));
    }

    #[tokio::test]
    async fn test_consume_without_done_is_interrupted() {
        let body = chunks(&["data: {\"content\":\"cut\"}\n\n"]);
        let outcome = consume(body, |_| {}).await;
        assert_eq!(outcome, Outcome::Interrupted { partial: "cut".into() });
        assert_eq!(outcome.text(), "cut");
        assert!(!outcome.is_answer());
    }

    #[tokio::test]
    async fn test_consume_raw_split_utf8() {
        let bytes = "héllo".as_bytes();
        let items: Vec<Result<Bytes, io::Error>> = vec![
            Ok(Bytes::copy_from_slice(&bytes[..2])),
            Ok(Bytes::copy_from_slice(&bytes[2..])),
        ];
        let outcome = consume_raw(stream::iter(items), |_| {}).await;
        assert_eq!(outcome, Outcome::Answer("héllo".into()));
    }

    #[tokio::test]
    async fn test_consume_raw_abort_is_interrupted() {
        let items: Vec<Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from("partial")),
            Err(io::Error::other("connection reset")),
        ];
        let outcome = consume_raw(stream::iter(items), |_| {}).await;
        assert_eq!(outcome, Outcome::Interrupted { partial: "partial".into() });
    }
}
