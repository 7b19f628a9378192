//! Error types for the localseek domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; all of them fold into
//! [`Error`], which is what a failed turn reports to the session loop.

use thiserror::Error;

/// The top-level error type for all localseek operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Inference errors ---
    #[error("Inference error: {0}")]
    Provider(#[from] ProviderError),

    // --- Source fetching errors ---
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    // --- Prompt assembly ---
    #[error("Prompt assembly failed: {0}")]
    Assembly(String),

    // --- Input ---
    #[error("Query is empty")]
    EmptyQuery,

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of the inference endpoint. None of these are retried.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Inference service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Malformed response stream: {0}")]
    Protocol(String),

    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Model reported an error: {0}")]
    Generation(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Classify a transport-level `reqwest`-style failure by its flags.
    pub fn from_transport(is_connect: bool, is_timeout: bool, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        if is_timeout {
            Self::Timeout(detail)
        } else if is_connect {
            Self::ServiceUnavailable(detail)
        } else {
            Self::Network(detail)
        }
    }
}

/// Failures while gathering sources. Every variant degrades the turn to
/// zero sources instead of failing it.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Timed out fetching {url} after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("HTTP {status} fetching {url}")]
    Http { url: String, status: u16 },

    #[error("Unsupported content type at {url}: {content_type}")]
    UnsupportedContent { url: String, content_type: String },

    #[error("No extractable text at {0}")]
    NoContent(String),

    #[error("Failed to parse response from {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error("Transcript unavailable for video {video_id}: {reason}")]
    TranscriptUnavailable { video_id: String, reason: String },
}
