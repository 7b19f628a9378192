//! Network side of source fetching.
//!
//! One request at a time, each bounded by the configured request timeout.
//! A page that fails is logged and skipped; only a failed search or a
//! video with neither transcript nor readable page is an error.

use crate::extract::extract_text;
use crate::search::parse_results;
use crate::youtube::{self, CaptionTrack};
use async_trait::async_trait;
use localseek_config::SearchConfig;
use localseek_core::source::{FetchTarget, SourceFetcher, SourceText};
use localseek_core::FetchError;
use std::time::Duration;
use tracing::{debug, info, warn};

const YOUTUBE_BASE: &str = "https://www.youtube.com";

/// Settings for [`WebSourceFetcher`], usually taken from `[search]`.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub max_results: usize,
    pub request_timeout: Duration,
    pub max_length_per_source: usize,
    pub search_endpoint: String,
    pub user_agent: String,
    pub youtube_base: String,
}

impl FetchSettings {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            max_results: config.max_results,
            request_timeout: config.request_timeout(),
            max_length_per_source: config.max_length_per_source,
            search_endpoint: config.endpoint.clone(),
            user_agent: config.user_agent.clone(),
            youtube_base: YOUTUBE_BASE.into(),
        }
    }

    /// Point watch page requests somewhere other than youtube.com.
    pub fn with_youtube_base(mut self, base: impl Into<String>) -> Self {
        self.youtube_base = base.into().trim_end_matches('/').to_string();
        self
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self::from_config(&SearchConfig::default())
    }
}

/// Fetches sources from the live web.
pub struct WebSourceFetcher {
    client: reqwest::Client,
    settings: FetchSettings,
}

impl WebSourceFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(&settings.user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| FetchError::Network {
                url: String::new(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Run the search and return result URLs.
    pub async fn search(&self, query: &str) -> Result<Vec<String>, FetchError> {
        let endpoint = &self.settings.search_endpoint;
        let response = self
            .client
            .post(endpoint)
            .timeout(self.settings.request_timeout)
            .header("Accept", "text/html")
            .form(&[("q", query)])
            .send()
            .await
            .map_err(|e| self.request_error(endpoint, &e))?;

        if !response.status().is_success() {
            return Err(FetchError::Http {
                url: endpoint.clone(),
                status: response.status().as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.request_error(endpoint, &e))?;

        let urls = parse_results(&body, self.settings.max_results);
        info!(count = urls.len(), "Search returned results");
        Ok(urls)
    }

    /// Fetch one page and extract its text.
    pub async fn fetch_page(&self, url: &str) -> Result<SourceText, FetchError> {
        let (content_type, body) = self.get(url).await?;
        let text = extract_text(url, &content_type, &body)?;
        Ok(SourceText::new(url, text, self.settings.max_length_per_source))
    }

    /// Fetch a video's transcript, falling back to scraping its page.
    pub async fn fetch_video(&self, url: &str, video_id: &str) -> Result<SourceText, FetchError> {
        match self.fetch_transcript(video_id).await {
            Ok(source) => Ok(source),
            Err(e) => {
                warn!(video_id, error = %e, "Transcript unavailable, scraping the page instead");
                self.fetch_page(&normalize_url(url)).await
            }
        }
    }

    async fn fetch_transcript(&self, video_id: &str) -> Result<SourceText, FetchError> {
        let watch_url = format!("{}/watch?v={video_id}", self.settings.youtube_base);
        let (_, html) = self.get(&watch_url).await?;
        let page = youtube::parse_watch_page(&html);

        let track = youtube::choose_track(&page.tracks).ok_or_else(|| {
            FetchError::TranscriptUnavailable {
                video_id: video_id.to_string(),
                reason: "video has no caption tracks".into(),
            }
        })?;
        debug!(
            video_id,
            language = %track.language_code,
            generated = track.is_generated(),
            "Selected caption track"
        );

        let xml = self.fetch_track(track).await?;
        let transcript =
            youtube::parse_timedtext(&xml).map_err(|reason| FetchError::TranscriptUnavailable {
                video_id: video_id.to_string(),
                reason,
            })?;
        if transcript.trim().is_empty() {
            return Err(FetchError::TranscriptUnavailable {
                video_id: video_id.to_string(),
                reason: "caption track is empty".into(),
            });
        }

        let body = youtube::transcript_body(
            video_id,
            page.title.as_deref(),
            page.description.as_deref(),
            &transcript,
        );
        info!(video_id, chars = transcript.len(), "Transcript extracted");
        Ok(SourceText::transcript(
            video_id,
            body,
            self.settings.max_length_per_source,
        ))
    }

    /// Non-English tracks are asked for in English first.
    async fn fetch_track(&self, track: &CaptionTrack) -> Result<String, FetchError> {
        if !track.is_english() {
            match self.get(&track.translated_url()).await {
                Ok((_, xml)) if !xml.trim().is_empty() => return Ok(xml),
                Ok(_) => warn!(language = %track.language_code, "Translated track is empty"),
                Err(e) => warn!(language = %track.language_code, error = %e, "Could not translate transcript"),
            }
        }
        self.get(&track.base_url).await.map(|(_, xml)| xml)
    }

    /// GET a URL, returning its content type and body text.
    async fn get(&self, url: &str) -> Result<(String, String), FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(self.settings.request_timeout)
            .send()
            .await
            .map_err(|e| self.request_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response
            .text()
            .await
            .map_err(|e| self.request_error(url, &e))?;

        Ok((content_type, body))
    }

    fn request_error(&self, url: &str, e: &reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout_secs: self.settings.request_timeout.as_secs(),
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

/// Users paste `youtu.be/...` without a scheme.
fn normalize_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

#[async_trait]
impl SourceFetcher for WebSourceFetcher {
    async fn fetch(&self, target: &FetchTarget) -> Result<Vec<SourceText>, FetchError> {
        match target {
            FetchTarget::Video { url, video_id } => {
                let source = self.fetch_video(url, video_id).await?;
                Ok(vec![source])
            }
            FetchTarget::Search { query } => {
                let urls = self.search(query).await?;
                let mut sources = Vec::with_capacity(urls.len());

                for url in &urls {
                    let result = match youtube::extract_video_id(url) {
                        Some(video_id) => self.fetch_video(url, &video_id).await,
                        None => self.fetch_page(url).await,
                    };
                    match result {
                        Ok(source) => {
                            debug!(url = %url, chars = source.char_len(), "Source extracted");
                            sources.push(source);
                        }
                        Err(e) => warn!(url = %url, error = %e, "Skipping source"),
                    }
                }

                info!(fetched = sources.len(), checked = urls.len(), "Sources gathered");
                Ok(sources)
            }
        }
    }
}
