//! OpenAI-compatible provider implementation.
//!
//! Works with llama.cpp server, vLLM, LM Studio, and Ollama's own `/v1`
//! shim. The prompt is sent as a single user message; the answer arrives
//! as server-sent events terminated by `data: [DONE]`.

use crate::framing;
use crate::ollama::transport_error;
use async_trait::async_trait;
use futures::StreamExt;
use localseek_core::error::ProviderError;
use localseek_core::provider::{GenerateRequest, Provider, StreamChunk, Usage};
use localseek_core::stream::ResponseStream;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, trace, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// A provider speaking the `/v1/chat/completions` protocol.
pub struct OpenAiCompatProvider {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// `base_url` is the server root; `/v1` is appended per request.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = base_url
            .trim_end_matches('/')
            .trim_end_matches("/v1")
            .to_string();
        Self {
            base_url,
            api_key: None,
            client: reqwest::Client::new(),
        }
    }

    /// Send a bearer token with every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    fn request_body(request: &GenerateRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": [{ "role": "user", "content": request.prompt }],
            "temperature": request.temperature,
            "stream": true,
            "stream_options": { "include_usage": true },
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn stream(&self, request: GenerateRequest) -> Result<ResponseStream, ProviderError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = Self::request_body(&request);

        debug!(model = %request.model, "Sending streaming request");

        let send = self
            .authorized(self.client.post(&url))
            .header("Accept", "text/event-stream")
            .json(&body)
            .send();

        let response = match tokio::time::timeout(request.timeout, send).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(transport_error(&url, &e)),
            Err(_) => {
                return Err(ProviderError::Timeout(format!(
                    "no response from {url} within {}s",
                    request.timeout.as_secs()
                )));
            }
        };

        let status = response.status().as_u16();
        if status == 404 {
            return Err(ProviderError::ModelNotFound(format!(
                "'{}' is not served at {}",
                request.model, self.base_url
            )));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider streaming error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let frames = framing::lines(response.bytes_stream())
            .filter_map(|line| async move {
                match line {
                    Ok(line) => parse_sse_line(&line).transpose(),
                    Err(e) => Some(Err(e)),
                }
            })
            .boxed();

        Ok(ResponseStream::new(frames, request.timeout))
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/v1/models", self.base_url);
        let response = self
            .authorized(self.client.get(&url))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| transport_error(&url, &e))?;

        if !response.status().is_success() {
            return Err(ProviderError::ApiError {
                status_code: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Protocol(format!("invalid model list: {e}")))?;

        let models = body["data"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m["id"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        Ok(models)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/v1/models", self.base_url);
        let response = self
            .authorized(self.client.get(&url))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| transport_error(&url, &e))?;

        Ok(response.status().is_success())
    }
}

/// Decode one SSE line. Comments and non-data fields yield `None`.
fn parse_sse_line(line: &str) -> Result<Option<StreamChunk>, ProviderError> {
    if line.starts_with(':') {
        return Ok(None);
    }
    let Some(data) = line.strip_prefix("data:") else {
        trace!(line, "Ignoring SSE field");
        return Ok(None);
    };
    let data = data.trim();

    if data == "[DONE]" {
        return Ok(Some(StreamChunk::finished(None)));
    }

    let event: StreamResponse = serde_json::from_str(data)
        .map_err(|e| ProviderError::Protocol(format!("invalid SSE chunk: {e}")))?;

    if let Some(error) = event.error {
        return Err(ProviderError::Generation(error.message));
    }

    let content = event
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content);

    Ok(Some(StreamChunk {
        content,
        done: false,
        usage: event.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
    }))
}

// --- Streaming SSE types ---

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
