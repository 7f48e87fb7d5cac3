//! Streamed answer decoding
//!
//! The questions endpoint answers with a sequence of JSON values, usually one
//! per line. Network chunks do not respect value boundaries, so the decoder
//! buffers the incomplete tail and hands out whole frames as they complete.

use crate::error::{Error, Result};
use bytes::{Buf, BytesMut};
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Incremental decoder of concatenated JSON frames
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
    /// The buffered tail is an incomplete frame that no chunk since could close
    incomplete: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a network chunk
    pub fn extend(&mut self, chunk: &[u8]) {
        // A string or object frame can only complete on a closing quote or brace
        if chunk.iter().any(|b| matches!(b, b'"' | b'}' | b']')) {
            self.incomplete = false;
        }
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete frame, or `None` when more bytes are needed
    pub fn next_frame(&mut self) -> Result<Option<Value>> {
        if self.incomplete {
            return Ok(None);
        }
        let (frame, consumed) = {
            let mut frames = serde_json::Deserializer::from_slice(&self.buf).into_iter::<Value>();
            match frames.next() {
                Some(Ok(value)) => (Some(value), frames.byte_offset()),
                Some(Err(e)) if e.is_eof() => {
                    self.incomplete = true;
                    return Ok(None);
                }
                Some(Err(e)) => {
                    return Err(Error::Protocol(format!("malformed answer frame: {}", e)))
                }
                // Only whitespace left
                None => (None, self.buf.len()),
            }
        };
        self.buf.advance(consumed);
        Ok(frame)
    }

    /// Check that the stream did not stop in the middle of a frame
    pub fn finish(&self) -> Result<()> {
        if self.buf.iter().all(u8::is_ascii_whitespace) {
            Ok(())
        } else {
            Err(Error::Protocol(format!(
                "answer stream ended inside a frame ({} bytes pending)",
                self.buf.len()
            )))
        }
    }
}

/// Extract the answer fragment carried by a frame.
///
/// A frame is either a bare string or an object with a string `answer`.
pub fn fragment_from_frame(frame: Value) -> Result<String> {
    match frame {
        Value::String(text) => Ok(text),
        Value::Object(mut fields) => match fields.remove("answer") {
            Some(Value::String(text)) => Ok(text),
            _ => Err(Error::Protocol(
                "answer frame object has no string `answer` field".to_string(),
            )),
        },
        other => Err(Error::Protocol(format!("unexpected answer frame: {}", other))),
    }
}

/// Lazy, finite, non-restartable sequence of answer fragments.
///
/// Nothing is sent until the first pull. Fragments arrive in network order
/// and are not retained once yielded. Dropping the stream abandons the
/// underlying response.
pub struct AnswerStream {
    inner: Pin<Box<dyn Stream<Item = Result<String>> + Send>>,
}

impl AnswerStream {
    pub(crate) fn new(inner: impl Stream<Item = Result<String>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(inner),
        }
    }

    /// Pull the next fragment; `None` once the answer is complete
    pub async fn next_fragment(&mut self) -> Option<Result<String>> {
        self.inner.next().await
    }

    /// Drain the stream into the full answer
    pub async fn collect_answer(mut self) -> Result<String> {
        let mut answer = String::new();
        while let Some(fragment) = self.next_fragment().await {
            answer.push_str(&fragment?);
        }
        Ok(answer)
    }
}

impl Stream for AnswerStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for AnswerStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerStream").finish_non_exhaustive()
    }
}
