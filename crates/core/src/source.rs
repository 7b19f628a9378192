//! Source domain types and the fetcher boundary.
//!
//! A [`SourceText`] is one unit of fetched content: the extracted text of a
//! search result or a video transcript. Sources live for a single turn.

use crate::error::FetchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Origin prefix used for video transcripts.
pub const YOUTUBE_ORIGIN_PREFIX: &str = "youtube:";

/// One fetched unit of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceText {
    /// URL, or `youtube:<video-id>` for transcripts
    pub origin: String,

    /// Extracted plain text, capped at the per-source limit
    pub body: String,
}

impl SourceText {
    /// Build a source, truncating `body` to at most `max_chars` characters.
    pub fn new(origin: impl Into<String>, body: impl Into<String>, max_chars: usize) -> Self {
        let mut body = body.into();
        truncate_chars(&mut body, max_chars);
        Self {
            origin: origin.into(),
            body,
        }
    }

    /// A transcript source for the given video.
    pub fn transcript(video_id: &str, body: impl Into<String>, max_chars: usize) -> Self {
        Self::new(format!("{YOUTUBE_ORIGIN_PREFIX}{video_id}"), body, max_chars)
    }

    /// Whether this source is a video transcript.
    pub fn is_transcript(&self) -> bool {
        self.origin.starts_with(YOUTUBE_ORIGIN_PREFIX)
    }

    /// Length of the body in characters.
    pub fn char_len(&self) -> usize {
        self.body.chars().count()
    }
}

/// Truncate `text` in place to at most `max_chars` characters.
///
/// Cuts on a char boundary; never splits a multi-byte character.
pub fn truncate_chars(text: &mut String, max_chars: usize) {
    if let Some((idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(idx);
    }
}

/// What a turn asks the fetcher for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchTarget {
    /// Run a web search and scrape the top results.
    Search { query: String },
    /// Retrieve the transcript of one video.
    Video { url: String, video_id: String },
}

impl FetchTarget {
    pub fn search(query: impl Into<String>) -> Self {
        Self::Search {
            query: query.into(),
        }
    }

    pub fn video(url: impl Into<String>, video_id: impl Into<String>) -> Self {
        Self::Video {
            url: url.into(),
            video_id: video_id.into(),
        }
    }
}

/// The Source Fetcher boundary.
///
/// Returns an ordered, possibly empty, list of sources. Callers treat an
/// error the same as an empty list.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, target: &FetchTarget) -> Result<Vec<SourceText>, FetchError>;
}
