//! YouTube URL recognition and transcript parsing.
//!
//! Everything here is pure; the watch page and caption download happen in
//! [`crate::fetcher`].

use crate::extract::{collapse_whitespace, meta_description, page_title};
use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use scraper::Html;
use serde::Deserialize;
use std::sync::LazyLock;

/// Query used when a video URL arrives without a real question.
pub const DEFAULT_VIDEO_QUERY: &str = "Provide a detailed summary of this video, covering all \
     main points and key information in a comprehensive way";

const SUMMARY_WORDS: &[&str] = &["summarize", "summarise", "summary"];

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(https?://)?(www\.|m\.)?(youtube|youtu|youtube-nocookie)\.(com|be)/(watch\?v=|embed/|v/|.+?\?v=)?([^&=%\?]{11})",
    )
    .expect("video id pattern is valid")
});

/// The 11-character video id of a YouTube URL, if `url` is one.
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID
        .captures(url)
        .and_then(|c| c.get(6))
        .map(|m| m.as_str().to_string())
}

/// A user input that names a video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoQuery {
    pub url: String,
    pub video_id: String,
    /// The input with the URL removed, or [`DEFAULT_VIDEO_QUERY`].
    pub query: String,
}

/// Split a user input into a video URL and the question about it.
///
/// Returns `None` when no word of the input is a YouTube URL.
pub fn split_query(input: &str) -> Option<VideoQuery> {
    let (url, video_id) = input
        .split_whitespace()
        .find_map(|word| extract_video_id(word).map(|id| (word, id)))?;

    let rest = collapse_whitespace(&input.replacen(url, "", 1));
    let query = if rest.is_empty() || SUMMARY_WORDS.contains(&rest.to_lowercase().as_str()) {
        DEFAULT_VIDEO_QUERY.to_string()
    } else {
        rest
    };

    Some(VideoQuery {
        url: url.to_string(),
        video_id,
        query,
    })
}

/// One entry of the player response's `captionTracks` list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "languageCode", default)]
    pub language_code: String,
    /// `"asr"` for auto-generated tracks
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_english(&self) -> bool {
        self.language_code == "en" || self.language_code.starts_with("en-")
    }

    pub fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }

    /// The track's URL asking for an English translation.
    pub fn translated_url(&self) -> String {
        format!("{}&tlang=en", self.base_url)
    }
}

/// What the watch page tells us about a video.
#[derive(Debug, Clone, Default)]
pub struct WatchPage {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tracks: Vec<CaptionTrack>,
}

/// Parse a watch page: title, description and the embedded caption tracks.
pub fn parse_watch_page(html: &str) -> WatchPage {
    let doc = Html::parse_document(html);
    WatchPage {
        title: page_title(&doc),
        description: meta_description(&doc),
        tracks: caption_tracks(html),
    }
}

fn caption_tracks(html: &str) -> Vec<CaptionTrack> {
    let Some(start) = html.find("\"captionTracks\":") else {
        return Vec::new();
    };
    let rest = &html[start + "\"captionTracks\":".len()..];
    serde_json::Deserializer::from_str(rest)
        .into_iter::<Vec<CaptionTrack>>()
        .next()
        .and_then(Result::ok)
        .unwrap_or_default()
}

/// Pick a track: English, else auto-generated, else the first.
pub fn choose_track(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
    tracks
        .iter()
        .find(|t| t.is_english())
        .or_else(|| tracks.iter().find(|t| t.is_generated()))
        .or_else(|| tracks.first())
}

/// Flatten a timedtext document into one caption per line.
///
/// Handles both the classic `<transcript><text>` layout and the
/// `<timedtext><body><p>` one.
pub fn parse_timedtext(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) if is_cue(e.name().as_ref()) => depth += 1,
            Event::End(e) if is_cue(e.name().as_ref()) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let line = collapse_whitespace(&decode_entities(&current));
                    if !line.is_empty() {
                        lines.push(line);
                    }
                    current.clear();
                }
            }
            Event::Text(t) if depth > 0 => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(&text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(lines.join("\n"))
}

fn is_cue(name: &[u8]) -> bool {
    name == b"text" || name == b"p"
}

/// Caption text is often escaped twice; undo the second layer.
fn decode_entities(text: &str) -> String {
    text.replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// The source body for a video: title, description, then the transcript.
pub fn transcript_body(
    video_id: &str,
    title: Option<&str>,
    description: Option<&str>,
    transcript: &str,
) -> String {
    let mut body = format!(
        "YOUTUBE VIDEO: {}\n\n",
        title.unwrap_or("Unknown YouTube Video")
    );
    if let Some(description) = description {
        body.push_str(&format!("Video Description: {description}\n\n"));
    }
    body.push_str(&format!(
        "YOUTUBE TRANSCRIPT [video_id: {video_id}]:\n\n{transcript}"
    ));
    body
}
