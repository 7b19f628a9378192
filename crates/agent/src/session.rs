//! The turn pipeline.
//!
//! One call to [`Session::run_turn`] is one full cycle:
//!
//! 1. **Route** the input: a YouTube URL selects transcript mode, anything
//!    else is a web search
//! 2. **Fetch** sources; a fetch failure degrades to zero sources
//! 3. **Assemble** the prompt from the query, sources and history
//! 4. **Stream** the answer to the caller's [`TurnSink`]
//! 5. **Record** the turn in history, only if the stream completed
//!
//! Turns run strictly one after another; the session is owned by the loop
//! that drives it.

use crate::context::{AssemblyInput, ContextAssembler, PromptBudget};
use localseek_config::AppConfig;
use localseek_core::{
    Error, FetchTarget, GenerateRequest, Provider, SourceFetcher, SourceText, Turn, Usage,
};
use localseek_memory::HistoryStore;
use localseek_sources::split_query;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-request inference parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub inference_timeout: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.inference.model.clone(),
            temperature: config.inference.temperature,
            max_tokens: Some(config.inference.max_tokens),
            inference_timeout: config.inference.timeout(),
        }
    }
}

/// Receives the visible output of a turn as it happens.
pub trait TurnSink {
    /// Called once, after fetching and before the model is asked.
    fn on_sources(&mut self, _sources: &[SourceText]) {}

    /// Called for every piece of answer text.
    fn on_chunk(&mut self, chunk: &str);
}

/// Discards everything.
impl TurnSink for () {
    fn on_chunk(&mut self, _chunk: &str) {}
}

/// The result of a completed turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub answer: String,
    /// Origins of the sources the prompt was built from
    pub sources: Vec<String>,
    pub usage: Option<Usage>,
}

/// A conversation with one fetcher, one inference endpoint and one history.
pub struct Session {
    fetcher: Arc<dyn SourceFetcher>,
    provider: Arc<dyn Provider>,
    assembler: ContextAssembler,
    history: HistoryStore,
    settings: SessionSettings,
}

impl Session {
    pub fn new(
        fetcher: Arc<dyn SourceFetcher>,
        provider: Arc<dyn Provider>,
        assembler: ContextAssembler,
        history: HistoryStore,
        settings: SessionSettings,
    ) -> Self {
        Self {
            fetcher,
            provider,
            assembler,
            history,
            settings,
        }
    }

    /// Wire a session from loaded configuration.
    pub fn from_config(
        config: &AppConfig,
        fetcher: Arc<dyn SourceFetcher>,
        provider: Arc<dyn Provider>,
    ) -> Self {
        let assembler = ContextAssembler::new(PromptBudget {
            max_chars: config.prompt.max_chars,
        })
        .with_system_prompt(config.prompt.system_prompt.clone());

        Self::new(
            fetcher,
            provider,
            assembler,
            HistoryStore::new(config.history.max_turns, config.history.enabled),
            SessionSettings::from_config(config),
        )
    }

    /// Run one turn for the user's `input`.
    ///
    /// On any error the history is left untouched. Dropping the returned
    /// future mid-stream has the same effect and releases the connection.
    pub async fn run_turn(
        &mut self,
        input: &str,
        sink: &mut dyn TurnSink,
    ) -> localseek_core::Result<TurnOutcome> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::EmptyQuery);
        }

        let (target, query) = route(input);
        let sources = self.fetch(&target).await;
        sink.on_sources(&sources);

        let history = self.history.read();
        if !history.is_empty() {
            info!(turns = history.len(), "Including previous turns");
        }

        let prompt = self
            .assembler
            .assemble(&AssemblyInput {
                query: &query,
                sources: &sources,
                history: &history,
                history_enabled: self.history.is_enabled(),
            })
            .map_err(|e| Error::Assembly(e.to_string()))?;

        debug!(
            chars = prompt.metadata.total_chars,
            sources = prompt.metadata.sources_included,
            "Sending prompt"
        );

        let mut request = GenerateRequest::new(
            self.settings.model.clone(),
            prompt.text,
            self.settings.inference_timeout,
        )
        .with_temperature(self.settings.temperature);
        if let Some(max_tokens) = self.settings.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let mut stream = self.provider.stream(request).await?;
        while let Some(chunk) = stream.next_chunk().await {
            sink.on_chunk(&chunk?);
        }

        let usage = stream.usage();
        let answer = stream
            .into_answer()
            .ok_or_else(|| Error::Internal("stream ended without an answer".into()))?;

        if answer.trim().is_empty() {
            warn!("Model returned an empty answer; not recorded in history");
        } else {
            self.history.append(Turn::new(input, answer.clone()));
        }

        Ok(TurnOutcome {
            answer,
            sources: sources.into_iter().map(|s| s.origin).collect(),
            usage,
        })
    }

    async fn fetch(&self, target: &FetchTarget) -> Vec<SourceText> {
        match target {
            FetchTarget::Search { query } => info!(%query, "Searching web"),
            FetchTarget::Video { video_id, .. } => info!(%video_id, "Fetching video transcript"),
        }

        match self.fetcher.fetch(target).await {
            Ok(sources) => {
                info!(count = sources.len(), "Sources fetched");
                sources
            }
            Err(e) => {
                warn!("Fetching sources failed, answering without them: {e}");
                Vec::new()
            }
        }
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Flip history on or off; returns the new state.
    pub fn toggle_history(&mut self) -> bool {
        self.history.toggle()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }
}

/// Split an input into what to fetch and the question to ask.
fn route(input: &str) -> (FetchTarget, String) {
    match split_query(input) {
        Some(video) => (FetchTarget::video(video.url, video.video_id), video.query),
        None => (FetchTarget::search(input), input.to_string()),
    }
}
