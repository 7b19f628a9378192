//! Ollama provider.
//!
//! Streams from `POST /api/generate`, which answers with newline-delimited
//! JSON objects. Each object carries a `response` fragment; the last one has
//! `done: true` and token counts.

use crate::framing;
use async_trait::async_trait;
use futures::StreamExt;
use localseek_core::error::ProviderError;
use localseek_core::provider::{GenerateRequest, Provider, StreamChunk, Usage};
use localseek_core::stream::ResponseStream;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Bound on the `models` and `doctor` health checks.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for a local Ollama server.
pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn request_body(request: &GenerateRequest) -> serde_json::Value {
        let mut options = serde_json::json!({ "temperature": request.temperature });
        if let Some(max_tokens) = request.max_tokens {
            options["num_predict"] = serde_json::json!(max_tokens);
        }
        serde_json::json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": true,
            "options": options,
        })
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn stream(&self, request: GenerateRequest) -> Result<ResponseStream, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = Self::request_body(&request);

        debug!(
            model = %request.model,
            prompt_chars = request.prompt.len(),
            "Sending streaming request to Ollama"
        );

        let send = self.client.post(&url).json(&body).send();
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
                "'{}' is not available at {} (try `ollama pull {}`)",
                request.model, self.base_url, request.model
            )));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Ollama returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let frames = framing::lines(response.bytes_stream())
            .map(|line| line.and_then(|l| parse_frame(&l)))
            .boxed();

        Ok(ResponseStream::new(frames, request.timeout))
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
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

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Protocol(format!("invalid model list: {e}")))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let response = self
            .client
            .get(&self.base_url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| transport_error(&self.base_url, &e))?;

        Ok(response.status().is_success())
    }
}

pub(crate) fn transport_error(url: &str, e: &reqwest::Error) -> ProviderError {
    ProviderError::from_transport(e.is_connect(), e.is_timeout(), format!("{url}: {e}"))
}

fn parse_frame(line: &str) -> Result<StreamChunk, ProviderError> {
    let frame: GenerateFrame = serde_json::from_str(line)
        .map_err(|e| ProviderError::Protocol(format!("invalid frame: {e}")))?;

    if let Some(error) = frame.error {
        return Err(ProviderError::Generation(error));
    }

    let usage = match (frame.done, frame.prompt_eval_count, frame.eval_count) {
        (true, None, None) | (false, _, _) => None,
        (true, prompt, completion) => {
            let prompt = prompt.unwrap_or(0);
            let completion = completion.unwrap_or(0);
            Some(Usage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
            })
        }
    };

    Ok(StreamChunk {
        content: frame.response,
        done: frame.done,
        usage,
    })
}

// --- Ollama API types (internal) ---

#[derive(Debug, Deserialize)]
struct GenerateFrame {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}
