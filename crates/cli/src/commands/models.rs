//! `localseek models` — List models on the inference endpoint.

use localseek_providers::build_from_config;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let provider = build_from_config(&config.inference)?;

    let models = provider.list_models().await?;
    println!("🤖 Models at {} ({})", config.inference.endpoint, provider.name());
    println!();
    if models.is_empty() {
        println!("  No models installed.");
    }
    for model in models {
        let marker = if model == config.inference.model { "*" } else { " " };
        println!("  {marker} {model}");
    }

    Ok(())
}
