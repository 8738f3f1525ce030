//! Per-request tasks that translate provider chunks into response bytes

use super::frame::Frame;
use crate::api::StreamChunk;
use bytes::Bytes;
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tracing::debug;

pub const NO_CONTENT_MESSAGE: &str = "No content received from the provider";
pub const DEADLINE_MESSAGE: &str = "Maximum duration exceeded";

/// How the upstream sequence ended
enum Ending {
    Finished { fragments: usize },
    Failed(String),
    /// The response body was dropped, usually a client disconnect
    Abandoned,
}

/// Send each text delta through `out` until the upstream finishes, fails or
/// the deadline passes. Returns as soon as the receiving side of `out` is
/// dropped, even while the upstream is silent. Dropping `upstream` on return
/// stops the provider task.
async fn drain<T, F>(
    mut upstream: mpsc::Receiver<StreamChunk>,
    max_duration: Duration,
    out: &mpsc::Sender<T>,
    wrap: F,
) -> Ending
where
    F: Fn(String) -> T,
{
    let deadline = Instant::now() + max_duration;
    let mut fragments = 0usize;

    loop {
        let next = tokio::select! {
            _ = out.closed() => return Ending::Abandoned,
            next = timeout_at(deadline, upstream.recv()) => next,
        };

        match next {
            Err(_) => return Ending::Failed(DEADLINE_MESSAGE.to_string()),
            Ok(None) => return Ending::Finished { fragments },
            Ok(Some(StreamChunk::TextDelta(text))) => {
                if text.is_empty() {
                    continue;
                }
                fragments += 1;
                if out.send(wrap(text)).await.is_err() {
                    return Ending::Abandoned;
                }
            }
            Ok(Some(StreamChunk::Done(usage))) => {
                debug!(
                    "Upstream done: {} fragments, {} prompt + {} completion tokens",
                    fragments, usage.prompt_tokens, usage.completion_tokens
                );
                return Ending::Finished { fragments };
            }
            Ok(Some(StreamChunk::Error(message))) => return Ending::Failed(message),
        }
    }
}

/// Spawn the event-framed pump.
///
/// Every content frame is written as it arrives; the stream always closes
/// with a single `[DONE]`, preceded by one error frame when the upstream
/// failed or produced nothing.
pub fn spawn_event_pump(
    upstream: mpsc::Receiver<StreamChunk>,
    max_duration: Duration,
) -> mpsc::Receiver<Bytes> {
    let (tx, rx) = mpsc::channel::<Bytes>(64);

    tokio::spawn(async move {
        let ending = drain(upstream, max_duration, &tx, |text| {
            Bytes::from(Frame::Content(text).encode())
        })
        .await;

        let error = match ending {
            Ending::Abandoned => return,
            Ending::Failed(message) => Some(message),
            Ending::Finished { fragments: 0 } => Some(NO_CONTENT_MESSAGE.to_string()),
            Ending::Finished { .. } => None,
        };

        if let Some(message) = error {
            debug!("Relay stream ending with error frame: {}", message);
            if tx.send(Frame::Error(message).encode().into()).await.is_err() {
                return;
            }
        }
        let _ = tx.send(Frame::Done.encode().into()).await;
    });

    rx
}

/// Frames for a stream that failed before its first fragment
pub fn error_frames(message: &str) -> Bytes {
    let mut body = Frame::Error(message.to_string()).encode();
    body.push_str(&Frame::Done.encode());
    Bytes::from(body)
}

/// Spawn the raw-chunk pump: fragments verbatim, end of body on success,
/// an error item (aborting the body) on failure or empty output.
pub fn spawn_raw_pump(
    upstream: mpsc::Receiver<StreamChunk>,
    max_duration: Duration,
) -> mpsc::Receiver<Result<Bytes, io::Error>> {
    let (tx, rx) = mpsc::channel::<Result<Bytes, io::Error>>(64);

    tokio::spawn(async move {
        let ending = drain(upstream, max_duration, &tx, |text| Ok(Bytes::from(text))).await;

        let failure = match ending {
            Ending::Abandoned => return,
            Ending::Finished { fragments } if fragments > 0 => return,
            Ending::Finished { .. } => NO_CONTENT_MESSAGE.to_string(),
            Ending::Failed(message) => message,
        };
        let _ = tx.send(Err(io::Error::other(failure))).await;
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TokenUsage;

    async fn collect_event(chunks: Vec<StreamChunk>) -> String {
        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            tx.try_send(chunk).unwrap();
        }
        drop(tx);

        let mut out = spawn_event_pump(rx, Duration::from_secs(5));
        let mut body = String::new();
        while let Some(bytes) = out.recv().await {
            body.push_str(std::str::from_utf8(&bytes).unwrap());
        }
        body
    }

    #[tokio::test]
    async fn test_event_pump_normal_stream() {
        let body = collect_event(vec![
            StreamChunk::TextDelta("a".into()),
            StreamChunk::TextDelta("b".into()),
            StreamChunk::Done(TokenUsage::default()),
        ])
        .await;
        assert_eq!(
            body,
            "data: {\"content\":\"a\"}\n\ndata: {\"content\":\"b\"}\n\ndata: [DONE]\n\n"
        );
    }

    #[tokio::test]
    async fn test_event_pump_closed_without_done() {
        let body = collect_event(vec![StreamChunk::TextDelta("a".into())]).await;
        assert_eq!(body, "data: {\"content\":\"a\"}\n\ndata: [DONE]\n\n");
    }

    #[tokio::test]
    async fn test_event_pump_skips_empty_deltas() {
        let body = collect_event(vec![
            StreamChunk::TextDelta(String::new()),
            StreamChunk::Done(TokenUsage::default()),
        ])
        .await;
        assert_eq!(
            body,
            format!("data: {{\"error\":\"{}\"}}\n\ndata: [DONE]\n\n", NO_CONTENT_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_event_pump_deadline() {
        let (tx, rx) = mpsc::channel(1);
        let mut out = spawn_event_pump(rx, Duration::from_millis(20));
        let mut body = String::new();
        while let Some(bytes) = out.recv().await {
            body.push_str(std::str::from_utf8(&bytes).unwrap());
        }
        drop(tx);
        assert_eq!(
            body,
            format!("data: {{\"error\":\"{}\"}}\n\ndata: [DONE]\n\n", DEADLINE_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_event_pump_stops_when_client_leaves() {
        let (tx, rx) = mpsc::channel(4);
        let out = spawn_event_pump(rx, Duration::from_secs(5));
        drop(out);
        tx.send(StreamChunk::TextDelta("a".into())).await.unwrap();
        // The pump drops its upstream receiver once the body is gone
        tokio::time::timeout(Duration::from_secs(1), tx.closed())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_event_pump_stops_when_client_leaves_during_silence() {
        let (tx, rx) = mpsc::channel::<StreamChunk>(4);
        let out = spawn_event_pump(rx, Duration::from_secs(5));
        drop(out);
        // Nothing is sent upstream; the disconnect alone must release it
        tokio::time::timeout(Duration::from_millis(500), tx.closed())
            .await
            .expect("upstream still held after the client left");
    }

    #[tokio::test]
    async fn test_raw_pump_stops_when_client_leaves_during_silence() {
        let (tx, rx) = mpsc::channel::<StreamChunk>(4);
        let out = spawn_raw_pump(rx, Duration::from_secs(5));
        drop(out);
        tokio::time::timeout(Duration::from_millis(500), tx.closed())
            .await
            .expect("upstream still held after the client left");
    }

    #[tokio::test]
    async fn test_event_pump_mid_stream_error_bytes() {
        let body = collect_event(vec![
            StreamChunk::TextDelta("f1".into()),
            StreamChunk::TextDelta("f2".into()),
            StreamChunk::Error("boom".into()),
            StreamChunk::TextDelta("ignored".into()),
        ])
        .await;
        assert_eq!(
            body,
            "data: {\"content\":\"f1\"}\n\ndata: {\"content\":\"f2\"}\n\n\
             data: {\"error\":\"boom\"}\n\ndata: [DONE]\n\n"
        );
        assert_eq!(body.matches("[DONE]").count(), 1);
    }

    #[tokio::test]
    async fn test_raw_pump_error_aborts() {
        let (tx, rx) = mpsc::channel(4);
        tx.try_send(StreamChunk::TextDelta("partial".into())).unwrap();
        tx.try_send(StreamChunk::Error("upstream reset".into())).unwrap();
        drop(tx);

        let mut out = spawn_raw_pump(rx, Duration::from_secs(5));
        assert_eq!(out.recv().await.unwrap().unwrap(), Bytes::from("partial"));
        let err = out.recv().await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "upstream reset");
        assert!(out.recv().await.is_none());
    }

    #[test]
    fn test_error_frames() {
        assert_eq!(
            error_frames("down"),
            Bytes::from("data: {\"error\":\"down\"}\n\ndata: [DONE]\n\n")
        );
    }
}
