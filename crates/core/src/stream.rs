//! Lazy, single-pass answer stream.
//!
//! [`ResponseStream`] wraps the decoded frames of one streaming response.
//! The caller pulls text with [`ResponseStream::next_chunk`]; every pull is
//! bounded by the request timeout. The complete answer only becomes
//! visible once the endpoint has sent its final frame. Any failure discards
//! what was accumulated and drops the underlying body, which closes the
//! connection. Dropping the stream early does the same.

use crate::error::ProviderError;
use crate::provider::{StreamChunk, Usage};
use futures::stream::{BoxStream, StreamExt};
use std::time::Duration;
use tracing::{debug, trace};

/// Decoded frames as produced by a provider.
pub type FrameStream = BoxStream<'static, Result<StreamChunk, ProviderError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Streaming,
    Completed,
    Failed,
}

/// The answer of one generation request, produced incrementally.
pub struct ResponseStream {
    frames: Option<FrameStream>,
    idle_timeout: Duration,
    state: StreamState,
    answer: String,
    chunks: usize,
    usage: Option<Usage>,
}

impl ResponseStream {
    pub fn new(frames: FrameStream, idle_timeout: Duration) -> Self {
        Self {
            frames: Some(frames),
            idle_timeout,
            state: StreamState::Streaming,
            answer: String::new(),
            chunks: 0,
            usage: None,
        }
    }

    /// Pull the next piece of text.
    ///
    /// Returns `None` once the final frame has been seen, or after an error
    /// has already been reported. Empty deltas are skipped.
    pub async fn next_chunk(&mut self) -> Option<Result<String, ProviderError>> {
        loop {
            let frames = self.frames.as_mut()?;

            let next = match tokio::time::timeout(self.idle_timeout, frames.next()).await {
                Ok(next) => next,
                Err(_) => {
                    return Some(Err(self.fail(ProviderError::Timeout(format!(
                        "no data received for {}s after {} chunk(s)",
                        self.idle_timeout.as_secs_f32(),
                        self.chunks
                    )))));
                }
            };

            let frame = match next {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => return Some(Err(self.fail(e))),
                None => {
                    return Some(Err(self.fail(ProviderError::Protocol(
                        "stream closed before the completion marker".into(),
                    ))));
                }
            };

            if frame.usage.is_some() {
                self.usage = frame.usage;
            }

            let text = frame.content.filter(|c| !c.is_empty());
            if let Some(ref t) = text {
                self.answer.push_str(t);
                self.chunks += 1;
                trace!(len = t.len(), "Stream chunk");
            }

            if frame.done {
                self.complete();
            }

            match text {
                Some(t) => return Some(Ok(t)),
                None if frame.done => return None,
                None => continue,
            }
        }
    }

    /// Drain the stream and return the complete answer.
    pub async fn collect(mut self) -> Result<String, ProviderError> {
        while let Some(chunk) = self.next_chunk().await {
            chunk?;
        }
        self.into_answer().ok_or_else(|| {
            ProviderError::Protocol("stream ended without a complete answer".into())
        })
    }

    /// The complete answer, once the final frame has arrived.
    pub fn answer(&self) -> Option<&str> {
        match self.state {
            StreamState::Completed => Some(&self.answer),
            _ => None,
        }
    }

    /// Consume the stream, yielding the complete answer if it finished.
    pub fn into_answer(self) -> Option<String> {
        match self.state {
            StreamState::Completed => Some(self.answer),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state == StreamState::Completed
    }

    /// Token counts reported by the endpoint, if any.
    pub fn usage(&self) -> Option<Usage> {
        self.usage
    }

    /// Number of non-empty chunks handed out so far.
    pub fn chunks_emitted(&self) -> usize {
        self.chunks
    }

    fn complete(&mut self) {
        self.state = StreamState::Completed;
        self.frames = None;
        debug!(chunks = self.chunks, chars = self.answer.len(), "Stream completed");
    }

    fn fail(&mut self, error: ProviderError) -> ProviderError {
        self.state = StreamState::Failed;
        self.frames = None;
        self.answer.clear();
        debug!(error = %error, chunks = self.chunks, "Stream failed, partial answer discarded");
        error
    }
}

impl std::fmt::Debug for ResponseStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStream")
            .field("state", &self.state)
            .field("chunks", &self.chunks)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}
