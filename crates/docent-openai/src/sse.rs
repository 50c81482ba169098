//! Server-sent-events framing for streamed chat completions.
//!
//! The completions endpoint streams `data: {json}` events separated by blank
//! lines and terminated by `data: [DONE]`. This module turns a raw byte
//! stream into a [`ReplyStream`] of content deltas, surfacing mid-stream
//! transport failures as a final error item (fragments already delivered
//! are not retracted).

use std::collections::VecDeque;
use std::fmt::Display;

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;

use docent_core::{DocentError, ReplyStream};

/// One streamed completion chunk (only the fields we read).
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

impl StreamChunk {
    fn first_delta(&self) -> Option<String> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.clone())
            .filter(|content| !content.is_empty())
    }
}

struct SseState<E> {
    inner: BoxStream<'static, Result<Bytes, E>>,
    buffer: String,
    pending: VecDeque<Result<String, DocentError>>,
    done: bool,
}

impl<E: Display> SseState<E> {
    /// Split complete events off the buffer and queue their deltas.
    fn drain_events(&mut self) {
        while let Some(pos) = self.buffer.find("\n\n") {
            let event: String = self.buffer.drain(..pos + 2).collect();
            for line in event.lines() {
                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data == "[DONE]" {
                    self.done = true;
                    return;
                }
                match serde_json::from_str::<StreamChunk>(data) {
                    Ok(chunk) => {
                        if let Some(delta) = chunk.first_delta() {
                            self.pending.push_back(Ok(delta));
                        }
                    }
                    Err(e) => {
                        tracing::warn!("malformed stream event, aborting: {}", e);
                        self.pending.push_back(Err(DocentError::StreamInterrupted {
                            reason: format!("malformed stream event: {}", e),
                        }));
                        self.done = true;
                        return;
                    }
                }
            }
        }
    }
}

/// Turn a raw SSE byte stream into a stream of content deltas.
pub fn delta_stream<E>(bytes: BoxStream<'static, Result<Bytes, E>>) -> ReplyStream
where
    E: Display + Send + 'static,
{
    let state = SseState {
        inner: bytes,
        buffer: String::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.done {
                return None;
            }
            match state.inner.next().await {
                Some(Ok(chunk)) => {
                    // Normalize CRLF framing so proxy-rewritten streams
                    // still split on "\n\n".
                    let text = String::from_utf8_lossy(&chunk).replace('\r', "");
                    state.buffer.push_str(&text);
                    state.drain_events();
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((
                        Err(DocentError::StreamInterrupted {
                            reason: e.to_string(),
                        }),
                        state,
                    ));
                }
                None => {
                    state.done = true;
                    return None;
                }
            }
        }
    })
    .boxed()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn byte_stream(parts: Vec<&str>) -> BoxStream<'static, Result<Bytes, Infallible>> {
        let owned: Vec<Result<Bytes, Infallible>> = parts
            .into_iter()
            .map(|p| Ok(Bytes::copy_from_slice(p.as_bytes())))
            .collect();
        stream::iter(owned).boxed()
    }

    fn event(content: &str) -> String {
        format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":\"{}\"}}}}]}}\n\n",
            content
        )
    }

    #[tokio::test]
    async fn collects_deltas_until_done() {
        let body = format!("{}{}data: [DONE]\n\n", event("안녕"), event("하세요"));
        let deltas: Vec<_> = delta_stream(byte_stream(vec![&body])).collect().await;
        let text: String = deltas.into_iter().map(|d| d.unwrap()).collect();
        assert_eq!(text, "안녕하세요");
    }

    #[tokio::test]
    async fn events_split_across_chunks_reassemble() {
        let body = event("조각");
        let (left, right) = body.split_at(10);
        let deltas: Vec<_> = delta_stream(byte_stream(vec![left, right, "data: [DONE]\n\n"]))
            .collect()
            .await;
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].as_ref().unwrap(), "조각");
    }

    #[tokio::test]
    async fn crlf_framed_events_are_parsed() {
        let body =
            "data: {\"choices\":[{\"delta\":{\"content\":\"줄바꿈\"}}]}\r\n\r\ndata: [DONE]\r\n\r\n";
        let deltas: Vec<_> = delta_stream(byte_stream(vec![body])).collect().await;
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].as_ref().unwrap(), "줄바꿈");
    }

    #[tokio::test]
    async fn empty_deltas_are_skipped() {
        let body = format!(
            "data: {{\"choices\":[{{\"delta\":{{}}}}]}}\n\n{}data: [DONE]\n\n",
            event("본문")
        );
        let deltas: Vec<_> = delta_stream(byte_stream(vec![&body])).collect().await;
        assert_eq!(deltas.len(), 1);
    }

    #[tokio::test]
    async fn malformed_event_surfaces_stream_error_after_fragments() {
        let body = format!("{}data: {{broken\n\n", event("앞부분"));
        let deltas: Vec<_> = delta_stream(byte_stream(vec![&body])).collect().await;
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0].as_ref().unwrap(), "앞부분");
        assert!(matches!(
            deltas[1],
            Err(DocentError::StreamInterrupted { .. })
        ));
    }
}
