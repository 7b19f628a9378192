//! End-to-end tests for the localseek turn pipeline.
//!
//! These drive a full `Session`: input routing, source fetching, prompt
//! assembly, streaming and history. Some use scripted stand-ins for the
//! fetcher and model; others run the real HTTP clients against local
//! servers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use futures::StreamExt;
use futures::stream;
use localseek_agent::{ContextAssembler, PromptBudget, Session, SessionCommand, SessionSettings, TurnSink};
use localseek_config::AppConfig;
use localseek_core::error::{Error, FetchError, ProviderError};
use localseek_core::provider::{GenerateRequest, Provider, StreamChunk};
use localseek_core::source::{FetchTarget, SourceFetcher, SourceText};
use localseek_core::stream::ResponseStream;
use localseek_memory::HistoryStore;
use localseek_providers::OllamaProvider;
use localseek_sources::{FetchSettings, WebSourceFetcher};

// ── Scripted stand-ins ───────────────────────────────────────────────────

/// Answers every prompt with `"Answer N."` and remembers the prompts.
#[derive(Default)]
struct ScriptedProvider {
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn stream(&self, request: GenerateRequest) -> Result<ResponseStream, ProviderError> {
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(request.prompt);
        let n = prompts.len();

        let frames = stream::iter(vec![
            Ok(StreamChunk::text("Answer ")),
            Ok(StreamChunk::text(format!("{n}."))),
            Ok(StreamChunk::finished(None)),
        ])
        .boxed();
        Ok(ResponseStream::new(frames, request.timeout))
    }
}

struct StaticFetcher {
    sources: Vec<SourceText>,
}

#[async_trait::async_trait]
impl SourceFetcher for StaticFetcher {
    async fn fetch(&self, _target: &FetchTarget) -> Result<Vec<SourceText>, FetchError> {
        Ok(self.sources.clone())
    }
}

#[derive(Default)]
struct Collect {
    text: String,
    sources: Vec<String>,
}

impl TurnSink for Collect {
    fn on_sources(&mut self, sources: &[SourceText]) {
        self.sources = sources.iter().map(|s| s.origin.clone()).collect();
    }

    fn on_chunk(&mut self, chunk: &str) {
        self.text.push_str(chunk);
    }
}

fn settings() -> SessionSettings {
    SessionSettings {
        model: "deepseek-r1:1.5b".into(),
        temperature: 0.3,
        max_tokens: Some(2048),
        inference_timeout: Duration::from_secs(10),
    }
}

fn scripted_session(provider: Arc<ScriptedProvider>, max_turns: usize) -> Session {
    let fetcher = Arc::new(StaticFetcher {
        sources: vec![SourceText::new(
            "https://en.wikipedia.org/wiki/France",
            "Paris is the capital of France.",
            20_000,
        )],
    });
    Session::new(
        fetcher,
        provider,
        ContextAssembler::new(PromptBudget::default()),
        HistoryStore::new(max_turns, true),
        settings(),
    )
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

// ── Conversation behaviour ───────────────────────────────────────────────

#[tokio::test]
async fn e2e_history_window_slides() {
    let provider = Arc::new(ScriptedProvider::default());
    let mut session = scripted_session(provider.clone(), 3);

    for q in ["first", "second", "third", "fourth", "fifth"] {
        session.run_turn(q, &mut ()).await.unwrap();
    }

    let prompts = provider.prompts();
    // Fourth prompt sees the three turns before it, oldest first
    let fourth = &prompts[3];
    let a = fourth.find("User: first\nAssistant: Answer 1.").unwrap();
    let b = fourth.find("User: second\nAssistant: Answer 2.").unwrap();
    let c = fourth.find("User: third\nAssistant: Answer 3.").unwrap();
    assert!(a < b && b < c);

    // Fifth prompt: "first" has been evicted
    assert!(!prompts[4].contains("User: first\n"));
    assert!(prompts[4].contains("User: fourth\nAssistant: Answer 4."));

    let stored: Vec<String> = session.history().read().into_iter().map(|t| t.query).collect();
    assert_eq!(stored, vec!["third", "fourth", "fifth"]);
}

#[tokio::test]
async fn e2e_commands_drive_history() {
    let provider = Arc::new(ScriptedProvider::default());
    let mut session = scripted_session(provider.clone(), 3);

    session.run_turn("capital of France", &mut ()).await.unwrap();

    assert_eq!(SessionCommand::parse("TOGGLE HISTORY"), SessionCommand::ToggleHistory);
    assert!(!session.toggle_history());
    session.run_turn("private question", &mut ()).await.unwrap();
    assert!(!provider.prompts()[1].contains("capital of France\nAssistant"));

    assert!(session.toggle_history());
    session.run_turn("follow-up", &mut ()).await.unwrap();
    assert!(provider.prompts()[2].contains("User: capital of France"));

    assert_eq!(SessionCommand::parse("clear history"), SessionCommand::ClearHistory);
    session.clear_history();
    session.run_turn("fresh start", &mut ()).await.unwrap();
    assert!(!provider.prompts()[3].contains("<<<HISTORY>>>"));
}

#[tokio::test]
async fn e2e_config_file_shapes_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[history]
max_turns = 1

[prompt]
max_chars = 4000
system_prompt = "Answer in one sentence."
"#,
    )
    .unwrap();
    let config = AppConfig::load_from(&path).unwrap();

    let provider = Arc::new(ScriptedProvider::default());
    let fetcher = Arc::new(StaticFetcher {
        sources: vec![SourceText::new("https://a.example", "x".repeat(10_000), 20_000)],
    });
    let mut session = Session::from_config(&config, fetcher, provider.clone());

    session.run_turn("one", &mut ()).await.unwrap();
    session.run_turn("two", &mut ()).await.unwrap();

    let prompt = &provider.prompts()[1];
    assert!(prompt.starts_with("Answer in one sentence."));
    assert!(prompt.chars().count() <= 4000);
    assert!(prompt.contains(" [truncated]"));
    assert_eq!(session.history().len(), 1);
}

// ── Real HTTP paths ──────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_search_scrape_and_stream_over_http() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let results = format!(
        r#"<html><body><div class="result"><a class="result__a" href="{base}/paris">Paris</a></div></body></html>"#
    );
    let seen_prompt = Arc::new(Mutex::new(String::new()));
    let seen = seen_prompt.clone();

    let router = Router::new()
        .route("/html/", post(move || async move { Html(results) }))
        .route(
            "/paris",
            get(|| async {
                Html("<html><head><title>Paris</title></head><body><article>Paris is the capital and largest city of France.</article></body></html>")
            }),
        )
        .route(
            "/api/generate",
            post(move |body: String| async move {
                *seen.lock().unwrap() = body;
                [
                    r#"{"response":"The capital ","done":false}"#,
                    r#"{"response":"is Paris.","done":false}"#,
                    r#"{"response":"","done":true,"prompt_eval_count":120,"eval_count":5}"#,
                ]
                .join("\n")
            }),
        );
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

    let fetch_settings = FetchSettings {
        search_endpoint: format!("{base}/html/"),
        request_timeout: Duration::from_secs(2),
        ..FetchSettings::default()
    };
    let fetcher = Arc::new(WebSourceFetcher::new(fetch_settings).unwrap());
    let provider = Arc::new(OllamaProvider::new(&base));
    let mut session = Session::new(
        fetcher,
        provider,
        ContextAssembler::default(),
        HistoryStore::new(3, true),
        settings(),
    );

    let mut sink = Collect::default();
    let outcome = session
        .run_turn("What is the capital of France?", &mut sink)
        .await
        .unwrap();

    assert_eq!(outcome.answer, "The capital is Paris.");
    assert_eq!(sink.text, outcome.answer);
    assert_eq!(outcome.sources, vec![format!("{base}/paris")]);
    assert_eq!(outcome.usage.unwrap().total_tokens, 125);

    let body = seen_prompt.lock().unwrap().clone();
    assert!(body.contains("Paris is the capital and largest city of France."));
    assert!(body.contains("\"stream\":true"));
    assert_eq!(session.history().len(), 1);
}

#[tokio::test]
async fn e2e_unreachable_model_fails_turn_but_keeps_sources() {
    // Reserve a port, then free it so nothing is listening there
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();

    let fetcher = Arc::new(StaticFetcher {
        sources: vec![SourceText::new("https://a.example", "body", 100)],
    });
    let provider = Arc::new(OllamaProvider::new(format!("http://{addr}")));
    let mut session = Session::new(
        fetcher,
        provider,
        ContextAssembler::default(),
        HistoryStore::new(3, true),
        settings(),
    );

    let mut sink = Collect::default();
    let err = session.run_turn("anything", &mut sink).await.unwrap_err();

    assert!(matches!(err, Error::Provider(ProviderError::ServiceUnavailable(_))));
    assert_eq!(sink.sources, vec!["https://a.example"]);
    assert!(sink.text.is_empty());
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn e2e_failed_search_answers_from_general_knowledge() {
    let base = serve(Router::new().route("/html/", post(|| async { StatusCode::SERVICE_UNAVAILABLE }))).await;

    let fetch_settings = FetchSettings {
        search_endpoint: format!("{base}/html/"),
        ..FetchSettings::default()
    };
    let fetcher = Arc::new(WebSourceFetcher::new(fetch_settings).unwrap());
    let provider = Arc::new(ScriptedProvider::default());
    let mut session = Session::new(
        fetcher,
        provider.clone(),
        ContextAssembler::default(),
        HistoryStore::new(3, true),
        settings(),
    );

    let outcome = session.run_turn("What is the capital of France?", &mut ()).await.unwrap();

    assert!(outcome.sources.is_empty());
    assert!(provider.prompts()[0].contains("NO EXTERNAL SOURCES FOUND"));
    assert_eq!(session.history().len(), 1);
}
