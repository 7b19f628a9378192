//! Provider trait — the abstraction over inference endpoints.
//!
//! A Provider knows how to send an assembled prompt to a locally running
//! model server and hand the answer back as a lazy stream of text chunks.
//!
//! Implementations: Ollama (`/api/generate`), OpenAI-compatible servers.

use crate::error::ProviderError;
use crate::stream::ResponseStream;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single generation request.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// The model identifier (e.g., "deepseek-r1:1.5b", "llama3.2")
    pub model: String,

    /// The fully assembled prompt
    pub prompt: String,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,

    /// Bound on waiting for the response to start and between chunks
    pub timeout: Duration,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, timeout: Duration) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature: default_temperature(),
            max_tokens: None,
            timeout,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

fn default_temperature() -> f32 {
    0.3
}

/// Token usage information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One decoded frame of a streaming response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta
    #[serde(default)]
    pub content: Option<String>,

    /// Whether this is the final frame
    #[serde(default)]
    pub done: bool,

    /// Usage info (typically only in the final frame)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl StreamChunk {
    /// A content-only frame.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            done: false,
            usage: None,
        }
    }

    /// The terminating frame.
    pub fn finished(usage: Option<Usage>) -> Self {
        Self {
            content: None,
            done: true,
            usage,
        }
    }
}

/// The core Provider trait.
///
/// The session calls `stream()` without knowing which server is behind it.
/// Implementations must report an unreachable endpoint as
/// [`ProviderError::ServiceUnavailable`] before any chunk is produced.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "ollama").
    fn name(&self) -> &str;

    /// Open a single streaming request for the prompt.
    async fn stream(&self, request: GenerateRequest) -> Result<ResponseStream, ProviderError>;

    /// List models installed on the endpoint.
    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }

    /// Health check — can we reach the endpoint?
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_request_defaults() {
        let req = GenerateRequest::new("llama3.2", "hi", Duration::from_secs(5));
        assert!((req.temperature - 0.3).abs() < f32::EPSILON);
        assert!(req.max_tokens.is_none());
        assert_eq!(req.timeout, Duration::from_secs(5));
    }

    #[test]
    fn generate_request_builders() {
        let req = GenerateRequest::new("m", "p", Duration::from_secs(1))
            .with_temperature(0.9)
            .with_max_tokens(64);
        assert!((req.temperature - 0.9).abs() < f32::EPSILON);
        assert_eq!(req.max_tokens, Some(64));
    }

    #[test]
    fn stream_chunk_constructors() {
        let c = StreamChunk::text("Par");
        assert_eq!(c.content.as_deref(), Some("Par"));
        assert!(!c.done);

        let f = StreamChunk::finished(None);
        assert!(f.done);
        assert!(f.content.is_none());
    }
}
