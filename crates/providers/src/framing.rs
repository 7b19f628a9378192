//! Line framing over a streamed HTTP body.
//!
//! Bytes are buffered until a full line is available, so a multi-byte
//! character split across network chunks is reassembled before decoding.
//! Blank lines are skipped. A trailing line without a newline is still
//! emitted when the body ends.

use futures::stream::{self, BoxStream, Stream, StreamExt};
use localseek_core::ProviderError;
use std::fmt::Display;
use std::pin::Pin;

struct LineState<S> {
    body: Pin<Box<S>>,
    buffer: Vec<u8>,
    exhausted: bool,
}

/// Split a byte stream into UTF-8 text lines.
///
/// A transport error ends the stream with `StreamInterrupted`; invalid
/// UTF-8 is a `Protocol` error.
pub(crate) fn lines<S, B, E>(body: S) -> BoxStream<'static, Result<String, ProviderError>>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = LineState {
        body: Box::pin(body),
        buffer: Vec::new(),
        exhausted: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(pos) = state.buffer.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = state.buffer.drain(..=pos).collect();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                return Some((decode(line), state));
            }

            if state.exhausted {
                if state.buffer.iter().all(u8::is_ascii_whitespace) {
                    return None;
                }
                let line = std::mem::take(&mut state.buffer);
                return Some((decode(line), state));
            }

            match state.body.next().await {
                Some(Ok(bytes)) => state.buffer.extend_from_slice(bytes.as_ref()),
                Some(Err(e)) => {
                    state.exhausted = true;
                    state.buffer.clear();
                    return Some((Err(ProviderError::StreamInterrupted(e.to_string())), state));
                }
                None => state.exhausted = true,
            }
        }
    })
    .boxed()
}

fn decode(line: Vec<u8>) -> Result<String, ProviderError> {
    String::from_utf8(line)
        .map_err(|e| ProviderError::Protocol(format!("invalid UTF-8 in response stream: {e}")))
}
