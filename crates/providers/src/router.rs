//! Provider selection from configuration.

use crate::ollama::OllamaProvider;
use crate::openai_compat::OpenAiCompatProvider;
use localseek_config::InferenceConfig;
use localseek_core::error::{Error, Result};
use localseek_core::provider::Provider;
use std::sync::Arc;

/// Environment variable holding a bearer token for OpenAI-compatible servers.
pub const API_KEY_ENV: &str = "LOCALSEEK_API_KEY";

/// Build the provider named by `inference.api`.
pub fn build_from_config(config: &InferenceConfig) -> Result<Arc<dyn Provider>> {
    let provider: Arc<dyn Provider> = match config.api.as_str() {
        "ollama" => Arc::new(OllamaProvider::new(&config.endpoint)),
        "openai" => {
            let mut p = OpenAiCompatProvider::new(&config.endpoint);
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                p = p.with_api_key(key);
            }
            Arc::new(p)
        }
        other => {
            return Err(Error::Config {
                message: format!("unknown inference api '{other}' (expected ollama or openai)"),
            });
        }
    };

    tracing::debug!(
        provider = provider.name(),
        endpoint = %config.endpoint,
        "Inference provider ready"
    );

    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_ollama() {
        let provider = build_from_config(&InferenceConfig::default()).unwrap();
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn openai_api_selected() {
        let config = InferenceConfig {
            api: "openai".into(),
            endpoint: "http://localhost:8080".into(),
            ..Default::default()
        };
        assert_eq!(build_from_config(&config).unwrap().name(), "openai");
    }

    #[test]
    fn unknown_api_rejected() {
        let config = InferenceConfig {
            api: "carrier-pigeon".into(),
            ..Default::default()
        };
        let err = build_from_config(&config).err().unwrap();
        assert!(matches!(&err, Error::Config { message } if message.contains("carrier-pigeon")));
    }
}
